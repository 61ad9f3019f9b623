//! Data-access services. Handlers call these instead of building queries.

pub mod credential_service;

pub use credential_service::*;
