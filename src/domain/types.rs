//! Request and response shapes exchanged with clients, ViaCEP and the
//! users GraphQL API.
//!
//! Field names follow the backend vernacular (`nome`, `cep`, `logradouro`...)
//! so payloads pass through without renaming.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Backend-assigned user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inputs of `POST /usuario`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCreateRequest {
    pub name: String,
    pub email: String,
    pub postal_code: String,
}

/// Inputs of `PUT /usuarios/{id}`. Both fields are always sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdateRequest {
    pub name: String,
    pub email: String,
}

/// Pagination window for `GET /usuarios`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 10;

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: DEFAULT_PAGE, per_page: DEFAULT_PER_PAGE }
    }
}

impl PageRequest {
    /// Fill omitted values with the defaults (page 1, 10 per page)
    pub fn from_optional(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self { page: page.unwrap_or(DEFAULT_PAGE), per_page: per_page.unwrap_or(DEFAULT_PER_PAGE) }
    }
}

/// User object as returned by the backend.
///
/// Held as the raw JSON object so snapshots reach the client unmodified,
/// including nested `address` values the gateway knows nothing about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct User(pub Map<String, Value>);

impl User {
    /// Backend `id`, when it is an integer
    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(Value::as_i64)
    }
}

/// One page of users as returned by `usersPaginated`, forwarded as is.
///
/// Expected keys: `items`, `page`, `perPage`, `total`, `totalPages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaginatedUsers(pub Map<String, Value>);

impl PaginatedUsers {
    pub fn item_count(&self) -> usize {
        self.0.get("items").and_then(Value::as_array).map_or(0, Vec::len)
    }

    pub fn total(&self) -> Option<i64> {
        self.0.get("total").and_then(Value::as_i64)
    }
}

pub const USER_REMOVED_MESSAGE: &str = "Usuário removido com sucesso";

/// Confirmation returned by `DELETE /usuarios/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteConfirmation {
    pub message: String,
    pub removed_user: User,
}

impl DeleteConfirmation {
    pub fn new(removed_user: User) -> Self {
        Self { message: USER_REMOVED_MESSAGE.to_string(), removed_user }
    }
}

/// ViaCEP lookup response.
///
/// Every field is optional. An unknown code comes back as `{"erro": true}`
/// (older deployments send the string `"true"`); any `erro` key, whatever
/// its value, marks the code as not found.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostalLookup {
    #[serde(default, deserialize_with = "present")]
    pub erro: Option<Value>,
    #[serde(default)]
    pub logradouro: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default)]
    pub localidade: Option<String>,
    #[serde(default)]
    pub uf: Option<String>,
}

/// `Some` whenever the key exists, `null` included
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl PostalLookup {
    pub fn is_not_found(&self) -> bool {
        self.erro.is_some()
    }
}

/// Variables of the `CreateUser` mutation.
///
/// Address fields stay optional until [`CreateUserVariables::is_complete`]
/// has been checked; the gateway never sends an incomplete payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateUserVariables {
    pub nome: String,
    pub email: String,
    pub cep: String,
    pub logradouro: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
    pub estado: Option<String>,
}

impl CreateUserVariables {
    pub fn new(request: UserCreateRequest, lookup: PostalLookup) -> Self {
        Self {
            nome: request.name,
            email: request.email,
            cep: request.postal_code,
            logradouro: lookup.logradouro,
            bairro: lookup.bairro,
            cidade: lookup.localidade,
            estado: lookup.uf,
        }
    }

    /// True when all four address fields are present and non-empty
    pub fn is_complete(&self) -> bool {
        [&self.logradouro, &self.bairro, &self.cidade, &self.estado]
            .iter()
            .all(|field| field.as_deref().is_some_and(|v| !v.is_empty()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageVariables {
    pub page: i64,
    pub per_page: i64,
}

impl From<PageRequest> for PageVariables {
    fn from(page: PageRequest) -> Self {
        Self { page: page.page, per_page: page.per_page }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserIdVariables {
    pub id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateUserVariables {
    pub id: UserId,
    pub nome: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ana() -> UserCreateRequest {
        UserCreateRequest {
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            postal_code: "01310-100".to_string(),
        }
    }

    #[test]
    fn test_create_variables_from_lookup() {
        let lookup: PostalLookup = serde_json::from_value(json!({
            "cep": "01310-100",
            "logradouro": "Av. Paulista",
            "bairro": "Bela Vista",
            "localidade": "São Paulo",
            "uf": "SP",
            "ibge": "3550308"
        }))
        .unwrap();

        let vars = CreateUserVariables::new(ana(), lookup);
        assert!(vars.is_complete());
        assert_eq!(
            serde_json::to_value(&vars).unwrap(),
            json!({
                "nome": "Ana",
                "email": "ana@x.com",
                "cep": "01310-100",
                "logradouro": "Av. Paulista",
                "bairro": "Bela Vista",
                "cidade": "São Paulo",
                "estado": "SP"
            })
        );
    }

    #[test]
    fn test_create_variables_incomplete() {
        let complete = PostalLookup {
            erro: None,
            logradouro: Some("Av. Paulista".to_string()),
            bairro: Some("Bela Vista".to_string()),
            localidade: Some("São Paulo".to_string()),
            uf: Some("SP".to_string()),
        };

        let mut missing_street = complete.clone();
        missing_street.logradouro = None;
        assert!(!CreateUserVariables::new(ana(), missing_street).is_complete());

        let mut empty_bairro = complete.clone();
        empty_bairro.bairro = Some(String::new());
        assert!(!CreateUserVariables::new(ana(), empty_bairro).is_complete());

        let mut missing_uf = complete;
        missing_uf.uf = None;
        assert!(!CreateUserVariables::new(ana(), missing_uf).is_complete());
    }

    #[test]
    fn test_postal_not_found_marker() {
        let bool_marker: PostalLookup = serde_json::from_str(r#"{"erro": true}"#).unwrap();
        assert!(bool_marker.is_not_found());

        let string_marker: PostalLookup = serde_json::from_str(r#"{"erro": "true"}"#).unwrap();
        assert!(string_marker.is_not_found());

        let null_marker: PostalLookup = serde_json::from_str(r#"{"erro": null}"#).unwrap();
        assert!(null_marker.is_not_found());

        let found: PostalLookup = serde_json::from_str(r#"{"uf": "SP"}"#).unwrap();
        assert!(!found.is_not_found());
    }

    #[test]
    fn test_page_request_defaults() {
        assert_eq!(PageRequest::from_optional(None, None), PageRequest { page: 1, per_page: 10 });
        assert_eq!(PageRequest::from_optional(Some(3), None), PageRequest { page: 3, per_page: 10 });
        assert_eq!(
            serde_json::to_value(PageVariables::from(PageRequest::default())).unwrap(),
            json!({"page": 1, "perPage": 10})
        );
    }

    #[test]
    fn test_paginated_users_forwarded_as_is() {
        let raw = json!({
            "items": [{"id": 1, "nome": "Ana", "address": null}],
            "page": 2,
            "perPage": 5,
            "total": 7,
            "totalPages": 2
        });
        let page: PaginatedUsers = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(page.item_count(), 1);
        assert_eq!(page.total(), Some(7));
        assert_eq!(serde_json::to_value(&page).unwrap(), raw);
    }

    #[test]
    fn test_delete_confirmation_keeps_snapshot() {
        let snapshot = json!({
            "id": 7,
            "nome": "Ana",
            "email": "ana@x.com",
            "createdAt": "2024-05-01T12:00:00Z",
            "address": {
                "cep": "01310-100",
                "logradouro": "Av. Paulista",
                "complemento": "apto 12",
                "bairro": "Bela Vista",
                "cidade": "São Paulo",
                "estado": "SP"
            }
        });
        let user: User = serde_json::from_value(snapshot.clone()).unwrap();
        assert_eq!(user.id(), Some(7));

        let value = serde_json::to_value(DeleteConfirmation::new(user)).unwrap();
        assert_eq!(value["message"], USER_REMOVED_MESSAGE);
        assert_eq!(value["removedUser"], snapshot);
    }

    #[test]
    fn test_user_with_null_address_is_accepted() {
        let snapshot = json!({"id": 3, "nome": "Bia", "email": "bia@x.com", "address": null});
        let user: User = serde_json::from_value(snapshot.clone()).unwrap();
        assert_eq!(serde_json::to_value(&user).unwrap(), snapshot);
    }
}
