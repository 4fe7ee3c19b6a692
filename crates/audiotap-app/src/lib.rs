//! Audiotap App Services
//!
//! File-type gate, upload client, settings persistence and the session that
//! ties them to the `audiotap` engine.

pub mod config;
pub mod data;
pub mod error;
pub mod gate;
pub mod network;
pub mod session;

pub use error::{AppError, Result};
pub use session::Session;
