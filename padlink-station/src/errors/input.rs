#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Input backend failure: {0}")]
    Backend(String),

    #[error("Input backend {0} is not available in this build")]
    Unavailable(String),
}
