//! Auth types shared across Keystone services.
//!
//! Provides the access-token claim set and its validation. Only the accounts
//! service mints tokens; every other consumer only validates them.

pub mod token;
