//! Usuarios gateway library
//!
//! REST facade over the users GraphQL API. Exposes modules for integration
//! testing and binary reuse.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
