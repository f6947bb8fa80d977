//! The order record held by the order partitions.

mod record;
mod seat;
mod status;

pub use record::{Order, OrderChange};
pub use seat::SeatClass;
pub use status::OrderStatus;
