//! Socket sessions: who is behind each connection, and the event handler

pub mod connection;
pub mod registry;

pub use connection::{Connection, ConnectionHandler, Flow, HandlerError};
pub use registry::{AuthState, ConnectionId, SessionRegistry};
