//! Mesh deployment subsystem

pub mod config;
pub mod deleter;
pub mod deployer;
pub mod endpoint;
pub mod staleness;
pub mod verifier;
