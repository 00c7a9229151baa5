//! Error handling for devrig

pub mod types;

pub use types::RigError;
