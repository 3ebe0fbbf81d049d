//! Calverse: keyed generative-AI relay and config-gated client core.

pub mod client;
pub mod config;
pub mod error;
pub mod relay;
pub mod server;
