//! Infrastructure layer - cache store, interception and supporting services

pub mod cache;
pub mod executor;
pub mod interceptor;
pub mod logging;
pub mod observability;
