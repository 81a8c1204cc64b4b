//! Gateway handler - translates the REST operations into GraphQL calls
//!
//! Each operation is a single-shot translation: at most one postal lookup,
//! at most one backend call, no retries. The first upstream failure ends
//! the request.

use crate::domain::error::{GatewayError, Operation};
use crate::domain::types::{
    CreateUserVariables, DeleteConfirmation, PageRequest, PageVariables, PaginatedUsers,
    UpdateUserVariables, User, UserCreateRequest, UserId, UserIdVariables, UserUpdateRequest,
};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::graphql::GraphqlClient;
use crate::io::postal::PostalClient;
use crate::services::queries;
use anyhow::Context;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct GatewayHandler {
    postal: PostalClient,
    backend: GraphqlClient,
}

impl GatewayHandler {
    /// Build the handler with one HTTP client shared by both upstreams.
    ///
    /// The client owns the connection pool; it lives as long as the handler
    /// and is dropped with it at shutdown.
    pub fn new(config: &Config, metrics: Arc<Metrics>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("usuarios-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let postal = PostalClient::new(
            http.clone(),
            config.postal_url_template(),
            config.postal_timeout(),
            metrics.clone(),
        );
        let backend =
            GraphqlClient::new(http, config.graphql_url(), config.backend_timeout(), metrics);

        Ok(Self { postal, backend })
    }

    /// Create a user, enriching it with the address behind `postal_code`
    pub async fn create_user(&self, request: UserCreateRequest) -> Result<User, GatewayError> {
        let lookup = self.postal.lookup(&request.postal_code).await?;

        let variables = CreateUserVariables::new(request, lookup);
        if !variables.is_complete() {
            warn!("postal_lookup_incomplete_address");
            return Err(GatewayError::IncompleteAddressData);
        }

        let user: User = self
            .backend
            .execute(Operation::CreateUser, queries::CREATE_USER, &variables)
            .await?
            .field(queries::CREATE_USER_FIELD, Operation::CreateUser)?;

        info!(user_id = ?user.id(), "user_created");
        Ok(user)
    }

    /// Fetch one page of users; bounds are left to the backend
    pub async fn list_users(&self, page: PageRequest) -> Result<PaginatedUsers, GatewayError> {
        let users: PaginatedUsers = self
            .backend
            .execute(Operation::ListUsers, queries::USERS_PAGINATED, PageVariables::from(page))
            .await?
            .field(queries::USERS_PAGINATED_FIELD, Operation::ListUsers)?;

        debug!(
            page = page.page,
            per_page = page.per_page,
            items = users.item_count(),
            total = ?users.total(),
            "users_listed"
        );
        Ok(users)
    }

    /// Fetch one user.
    ///
    /// Every backend failure, not-found or otherwise, becomes `UserNotFound`
    /// and the cause is only logged.
    pub async fn get_user(&self, id: UserId) -> Result<User, GatewayError> {
        let result = self
            .backend
            .execute(Operation::GetUser, queries::USER_BY_ID, UserIdVariables { id })
            .await
            .and_then(|response| response.field(queries::USER_BY_ID_FIELD, Operation::GetUser));

        result.map_err(|e| {
            debug!(user_id = %id, cause = %e, "user_lookup_flattened_to_not_found");
            GatewayError::UserNotFound
        })
    }

    /// Replace name and email of a user; both are always sent
    pub async fn update_user(
        &self,
        id: UserId,
        request: UserUpdateRequest,
    ) -> Result<User, GatewayError> {
        let variables = UpdateUserVariables { id, nome: request.name, email: request.email };

        let user: User = self
            .backend
            .execute(Operation::UpdateUser, queries::UPDATE_USER, &variables)
            .await?
            .field(queries::UPDATE_USER_FIELD, Operation::UpdateUser)?;

        info!(user_id = %id, "user_updated");
        Ok(user)
    }

    /// Delete a user and echo the backend's snapshot of it
    pub async fn delete_user(&self, id: UserId) -> Result<DeleteConfirmation, GatewayError> {
        let removed: User = self
            .backend
            .execute(Operation::DeleteUser, queries::DELETE_USER, UserIdVariables { id })
            .await?
            .field(queries::DELETE_USER_FIELD, Operation::DeleteUser)?;

        info!(user_id = %id, "user_deleted");
        Ok(DeleteConfirmation::new(removed))
    }
}
