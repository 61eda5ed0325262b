//! Core types, wire protocol, config, and errors for PlexBridge.

pub mod config;
pub mod error;
pub mod outcome;
pub mod protocol;
