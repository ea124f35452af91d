//! Error types for the LWE450 listener

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// LWE450 listener error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be written
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Bus envelope encoding failed
    #[error("Encode error: {0}")]
    Encode(#[from] prost::EncodeError),

    /// Bus envelope decoding failed
    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Unterminated data grew past the framing limit
    #[error("Framing overflow: {len} unterminated bytes exceed limit of {max}")]
    FramingOverflow {
        /// Length of the discarded remainder
        len: usize,
        /// Configured maximum remainder size
        max: usize,
    },

    /// Stream peer closed the connection
    #[error("Transport disconnected")]
    Disconnected,

    /// Invalid frame on the bus
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
