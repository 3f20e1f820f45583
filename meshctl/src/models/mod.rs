//! Data models

pub mod mesh;
