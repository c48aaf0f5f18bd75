//! Warroom - A terminal client for streaming multi-agent incident investigations.

pub mod api;
pub mod client;
pub mod config;
pub mod conversation;
pub mod eventlog;
pub mod session;
pub mod sse_parser;
