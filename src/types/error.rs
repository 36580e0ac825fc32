use thiserror::Error;

/// Errors that can occur when using a channel.
///
/// Transport failures never reach application code through these variants at
/// runtime: transports log them and turn them into `error` / `disconnect`
/// events. They surface only from construction and misuse of the API.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// HTTP request error on the long-poll transport
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error (malformed page URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The page URL cannot be turned into channel endpoints
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A callback was registered for an event name the channel does not emit
    #[error("Unknown event type: {0}")]
    InvalidEventKind(String),

    /// The channel driver has shut down
    #[error("Channel closed")]
    Closed,
}

/// Convenience type alias for `Result<T, ChannelError>`.
pub type Result<T> = std::result::Result<T, ChannelError>;
