//! meshctl Library
//!
//! Core modules for deploying, verifying, and tearing down Adobe API Mesh
//! configurations through the Adobe I/O CLI.

pub mod deploy;
pub mod doctor;
pub mod errors;
pub mod exec;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod storage;
pub mod utils;
