//! Gateway error taxonomy and its HTTP translation
//!
//! Every failure is terminal for the request: nothing is retried and the
//! caller receives exactly one of these.

use serde_json::Value;
use thiserror::Error;

pub const LOOKUP_FAILED_MESSAGE: &str = "Erro ao consultar ViaCEP";
pub const POSTAL_CODE_NOT_FOUND_MESSAGE: &str = "CEP não encontrado no ViaCEP";
pub const INCOMPLETE_ADDRESS_MESSAGE: &str = "CEP retornou dados incompletos";
pub const USER_NOT_FOUND_MESSAGE: &str = "Usuário não encontrado";
pub const BACKEND_UNAVAILABLE_MESSAGE: &str = "Erro ao consultar a API de usuários";

/// Which gateway operation raised a backend error.
///
/// The status code of any backend failure depends on the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateUser,
    ListUsers,
    GetUser,
    UpdateUser,
    DeleteUser,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateUser => "create_user",
            Operation::ListUsers => "list_users",
            Operation::GetUser => "get_user",
            Operation::UpdateUser => "update_user",
            Operation::DeleteUser => "delete_user",
        }
    }

    /// HTTP status used for every backend failure of this operation
    fn backend_error_status(&self) -> u16 {
        match self {
            Operation::CreateUser | Operation::ListUsers => 500,
            Operation::GetUser => 404,
            Operation::UpdateUser | Operation::DeleteUser => 400,
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Postal service unreachable, non-2xx, or unreadable body
    #[error("postal lookup failed: {0}")]
    UpstreamLookup(String),

    /// Postal service flagged the code with its `erro` marker
    #[error("postal code not found")]
    PostalCodeNotFound,

    /// Postal service answered but left an address field blank
    #[error("postal lookup returned incomplete address")]
    IncompleteAddressData,

    /// Backend answered with a top-level GraphQL `errors` list
    #[error("backend returned errors for {}", operation.as_str())]
    Backend { operation: Operation, errors: Value },

    /// Any backend failure on the get-by-id path
    #[error("user not found")]
    UserNotFound,

    /// Backend unreachable, timed out, or answered with something that is
    /// not a GraphQL response carrying the expected field
    #[error("backend unavailable for {}: {reason}", operation.as_str())]
    BackendUnavailable { operation: Operation, reason: String },

    /// Required input missing, blank, or not parseable
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GatewayError {
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::UpstreamLookup(_) => 400,
            GatewayError::PostalCodeNotFound => 404,
            GatewayError::IncompleteAddressData => 400,
            GatewayError::Backend { operation, .. } => operation.backend_error_status(),
            GatewayError::UserNotFound => 404,
            GatewayError::BackendUnavailable { operation, .. } => operation.backend_error_status(),
            GatewayError::InvalidInput(_) => 422,
        }
    }

    /// Value placed under `detail` in the error body.
    ///
    /// Backend errors forward the raw GraphQL list; everything else is a
    /// fixed message.
    pub fn detail(&self) -> Value {
        match self {
            GatewayError::UpstreamLookup(_) => Value::from(LOOKUP_FAILED_MESSAGE),
            GatewayError::PostalCodeNotFound => Value::from(POSTAL_CODE_NOT_FOUND_MESSAGE),
            GatewayError::IncompleteAddressData => Value::from(INCOMPLETE_ADDRESS_MESSAGE),
            GatewayError::Backend { errors, .. } => errors.clone(),
            GatewayError::UserNotFound => Value::from(USER_NOT_FOUND_MESSAGE),
            GatewayError::BackendUnavailable { .. } => Value::from(BACKEND_UNAVAILABLE_MESSAGE),
            GatewayError::InvalidInput(msg) => Value::from(msg.as_str()),
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::UpstreamLookup(_) => "upstream_lookup",
            GatewayError::PostalCodeNotFound => "postal_code_not_found",
            GatewayError::IncompleteAddressData => "incomplete_address",
            GatewayError::Backend { .. } => "backend_error",
            GatewayError::UserNotFound => "user_not_found",
            GatewayError::BackendUnavailable { .. } => "backend_unavailable",
            GatewayError::InvalidInput(_) => "invalid_input",
        }
    }
}
