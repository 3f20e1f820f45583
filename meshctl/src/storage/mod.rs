//! Project storage

pub mod layout;
pub mod record;
pub mod settings;
