//! Request/response correlation over a fire-and-forget socket
//!
//! The plugin connection is a plain message bus: frames go out, frames come
//! in, nothing pairs them. The Correlator gives the tool surface a call/await
//! interface on top of it:
//! - **Call:** tag the request with a fresh `requestId` and wait
//! - **Ack:** an inbound `{"type": "ack", "requestId": n}` resolves call `n`
//! - **Timeout:** a call with no ack in time fails; whichever comes first wins
//!
//! At most one peer is attached at a time. A new connection supersedes the old
//! one, and a disconnect leaves pending calls to their own timeouts.

mod config;
mod core;
mod envelope;
mod error;
mod handle;
mod messages;

pub use config::CorrelatorConfig;
pub use self::core::Correlator;
pub use envelope::{ACK_TYPE, Ack, Envelope, Inbound};
pub use error::CallError;
pub use handle::CorrelatorHandle;
pub use messages::{CorrelatorMetrics, CorrelatorRequest, PeerId, RequestId};
