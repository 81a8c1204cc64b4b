//! IO modules - external system interfaces
//!
//! - `http_server` - inbound REST endpoints
//! - `postal` - ViaCEP postal code lookups
//! - `graphql` - GraphQL client for the users API
//! - `prometheus` - Prometheus text exposition served at `/metrics`

pub mod graphql;
pub mod http_server;
pub mod postal;
pub mod prometheus;

pub use graphql::{GraphqlClient, GraphqlResponse};
pub use http_server::{handle_request, serve, start_server};
pub use postal::PostalClient;
