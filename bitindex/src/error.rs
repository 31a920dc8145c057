use thiserror::Error;

/// Errors returned by index operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("bitindex: invalid input: {0}")]
    InvalidInput(String),

    #[error("bitindex: length mismatch: got {got} bits, want {want}")]
    LengthMismatch { got: usize, want: usize },

    #[error("bitindex: empty store")]
    EmptyStore,
}

/// Reasons an accelerated kernel is unavailable.
///
/// Never returned from a query: the ranker falls back to the scalar path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("bitindex: acceleration unsupported: {0}")]
    Unsupported(String),

    #[error("bitindex: acceleration disabled")]
    Disabled,

    #[error("bitindex: kernel load failed: {0}")]
    Load(String),
}
