//! Services - request translation
//!
//! - `gateway` - `GatewayHandler`, the five user operations
//! - `queries` - GraphQL documents sent to the users API

pub mod gateway;
pub mod queries;

// Re-export commonly used types
pub use gateway::GatewayHandler;
