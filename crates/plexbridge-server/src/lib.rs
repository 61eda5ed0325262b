//! PlexBridge relay server.
//!
//! The server is the middle of the bridge: it accepts many short-lived
//! HTTP requests from clients, forwards each as a work item to the single
//! connected browser peer over WebSocket, and correlates the peer's
//! eventual reply back to the waiting HTTP caller.

pub mod connection;
pub mod pending;
pub mod peer;
pub mod relay;
pub mod server;
pub mod state;

pub use relay::RelayCore;
pub use server::start_server;
pub use state::BridgeState;
