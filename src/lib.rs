// HTTP and WebSocket server modules
pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;

// Identity, sessions and storage
pub mod auth;
pub mod session;
pub mod store;

// Message DB client library
pub mod message_db;

// AI provider layer
pub mod llm;
