//! Service plumbing shared by Keystone services: configuration loading,
//! tracing setup, HTTP middleware, health checks and small serde/sea-orm helpers.

pub mod config;
pub mod health;
pub mod middleware;
pub mod sea_ext;
pub mod serde;
pub mod tracing;
