use thiserror::Error;

/// Error returned by [`DispatchHandle::execute`](crate::DispatchHandle::execute).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The single queue slot is taken (try again later).
    #[error("main-thread queue full")]
    Full,

    /// The main-thread loop has exited.
    #[error("main-thread executor closed")]
    Closed,
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::Full => "dispatch_full",
            DispatchError::Closed => "dispatch_closed",
        }
    }
}
