// Infrastructure module - Liveness, backoff and endpoint plumbing
pub mod heartbeat;
pub mod http;
pub mod presence;
pub mod reconnect;
pub mod task_manager;

pub use heartbeat::{HeartbeatAction, HeartbeatMonitor};
pub use http::{Endpoints, base_url, http_to_ws_origin};
pub use presence::{PresenceDecision, PresenceProbe};
pub use reconnect::{DisconnectOutcome, ReconnectController, backoff_delay};
pub use task_manager::TaskManager;
