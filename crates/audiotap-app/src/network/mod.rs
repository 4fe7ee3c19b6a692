//! Network operations
//!
//! HTTP client for the upload collaborator.

pub mod client;

pub use client::HttpClient;
