#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RadioError {
    #[error("No radio adapter available")]
    NoAdapter,

    #[error("Radio adapter error: {0}")]
    Adapter(String),

    #[error("Radio connect failed: {0}")]
    Connect(String),

    #[error("Radio write failed: {0}")]
    Write(String),

    #[error("Radio busy")]
    Busy,
}
