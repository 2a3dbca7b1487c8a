//! Infrastructure layer - External adapters and implementations
//!
//! - Persistence: SQLite repositories
//! - HTTP: REST API routes
//! - WebSocket: room presence, board sync and event push
//! - Config: process configuration
//! - State: service wiring shared by the handlers

pub mod config;
pub mod dice;
pub mod http;
pub mod persistence;
pub mod session;
pub mod session_adapter;
pub mod state;
pub mod websocket;
