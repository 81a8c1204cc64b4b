//! Domain models - request/response shapes and the error taxonomy
//!
//! - `types` - users, pagination, postal lookups and GraphQL variables
//! - `error` - `GatewayError` and its HTTP status mapping

pub mod error;
pub mod types;

pub use error::{GatewayError, Operation};
pub use types::{
    DeleteConfirmation, PageRequest, PaginatedUsers, User, UserCreateRequest, UserId,
    UserUpdateRequest,
};
