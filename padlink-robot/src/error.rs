use padlink_api::TransportKind;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Failed to bind {transport} listener on {address}: {source}")]
    Bind {
        transport: TransportKind,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No {0} listener is available on this platform")]
    UnsupportedListener(TransportKind),

    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("Radio listener failed: {0}")]
    Radio(String),
}
