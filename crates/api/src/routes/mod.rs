pub mod admin;
pub mod health;
pub mod history;
pub mod metrics;
pub mod rebook;
