// hactl-api: Async Rust client for the Home Assistant WebSocket API

pub mod error;
pub mod events;
pub mod protocol;
pub mod registry;
pub mod session;

pub use error::Error;
pub use events::{EventFilter, Subscription};
pub use protocol::{ApiErrorBody, HassEvent, IncomingFrame, ResponseEnvelope};
pub use registry::{
    AreaEntry, DeviceRegistryEntry, EntityRegistryEntry, ResolvedRegistry, resolve,
};
pub use session::{DEFAULT_HANDSHAKE_TIMEOUT, Session, websocket_url};
