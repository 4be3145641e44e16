//! Domain types shared across Keystone services.
//!
//! Pure types with no framework dependencies. Import in `usecase/` and
//! `domain/` layers; `infra/` converts to and from its own row types.

pub mod pagination;
pub mod user;
