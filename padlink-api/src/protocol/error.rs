use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Frame had no tokens
    EmptyFrame,
    /// Leading token is not a known command
    UnsupportedCommand(String),
    /// Event frame without control or value
    MissingValue(String),
    /// Value could not be parsed for the control's kind
    InvalidValue { control: String, value: String },
    /// Frame bytes were not ASCII/UTF-8
    NotText,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFrame => write!(f, "Empty frame"),
            Self::UnsupportedCommand(c) => write!(f, "Unsupported command: {}", c),
            Self::MissingValue(c) => write!(f, "Missing value for {}", c),
            Self::InvalidValue { control, value } => {
                write!(f, "Invalid value {:?} for {}", value, control)
            }
            Self::NotText => write!(f, "Frame is not valid text"),
        }
    }
}

impl std::error::Error for CodecError {}
