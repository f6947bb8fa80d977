//! Query access to a projected view.

pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of entries currently held. Zero while the view is being written.
    fn count(&self) -> usize;
}
