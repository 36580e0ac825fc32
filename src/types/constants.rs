/// Lifecycle event names accepted by `Channel::on` and used in transport logs
pub mod event_names {
    pub const MESSAGE: &str = "message";
    pub const CONNECT: &str = "connect";
    pub const DISCONNECT: &str = "disconnect";
    pub const ERROR: &str = "error";
}

/// Event name of the keep-alive frame sent on idleness and after every (re)connect
pub const PING_EVENT: &str = "ping";

/// Separator between an event name and its data in a framed send
pub const FRAME_SEPARATOR: char = ':';

/// Idle time after the last inbound activity before a ping is sent (milliseconds)
pub const PING_RATE_MS: u64 = 25_000;

/// Silence after which an open connection is presumed dead (milliseconds)
pub const STALE_THRESHOLD_MS: u64 = 45_000;

/// Upper bound of the reconnect attempt counter
pub const BACKOFF_CAP: u32 = 8;

/// Attempts after which a disconnect is reported to the application
pub const DISCONNECT_REPORT_THRESHOLD: u32 = 3;

/// Multiplier of the cubic backoff curve (milliseconds)
pub const BACKOFF_UNIT_MS: u64 = 100;

/// Reconnect delay used when the backoff curve cannot be computed (milliseconds)
pub const RECONNECT_FALLBACK_MS: u64 = 1001;

/// Upper bound on a WebSocket close handshake (milliseconds)
pub const SOCKET_CLOSE_TIMEOUT_MS: u64 = 5_000;

/// Query parameter carrying the socket id
pub const SOCKET_ID_PARAM: &str = "SBSocketId";

/// Path suffix of the persistent socket endpoint
pub const WEBSOCKET_PATH: &str = "/websocket";

/// Path suffix of the long-poll endpoint
pub const POLLING_PATH: &str = "/async";
