//! Inbound HTTP surface
//!
//! Routes the REST endpoints onto [`GatewayHandler`] and encodes results as
//! JSON. Uses hyper's HTTP/1 server directly; one task per connection.
//!
//! | Method | Path              | Operation  |
//! |--------|-------------------|------------|
//! | POST   | `/usuario`        | create     |
//! | GET    | `/usuarios`       | list       |
//! | GET    | `/usuarios/{id}`  | get        |
//! | PUT    | `/usuarios/{id}`  | update     |
//! | DELETE | `/usuarios/{id}`  | delete     |
//!
//! Inputs are read from the query string first, then from a JSON object
//! body. Errors are returned as `{"detail": ...}`.

use crate::domain::error::{GatewayError, Operation};
use crate::domain::types::{PageRequest, UserCreateRequest, UserId, UserUpdateRequest};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::prometheus;
use crate::services::GatewayHandler;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub type ResponseBody = Full<Bytes>;

/// Request bodies above this size are rejected
const MAX_BODY_BYTES: usize = 64 * 1024;

const JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ApiRoute {
    CreateUser,
    ListUsers,
    GetUser(String),
    UpdateUser(String),
    DeleteUser(String),
}

impl ApiRoute {
    fn operation(&self) -> Operation {
        match self {
            ApiRoute::CreateUser => Operation::CreateUser,
            ApiRoute::ListUsers => Operation::ListUsers,
            ApiRoute::GetUser(_) => Operation::GetUser,
            ApiRoute::UpdateUser(_) => Operation::UpdateUser,
            ApiRoute::DeleteUser(_) => Operation::DeleteUser,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Api(ApiRoute),
    Health,
    Metrics,
    MethodNotAllowed,
    NotFound,
}

fn match_route(method: &Method, path: &str) -> Route {
    let api = |route| Route::Api(route);
    match (method, path) {
        (&Method::POST, "/usuario") => api(ApiRoute::CreateUser),
        (&Method::GET, "/usuarios") => api(ApiRoute::ListUsers),
        (&Method::GET, "/health") => Route::Health,
        (&Method::GET, "/metrics") => Route::Metrics,
        (_, "/usuario" | "/usuarios" | "/health" | "/metrics") => Route::MethodNotAllowed,
        _ => {
            let Some(id) = path.strip_prefix("/usuarios/").filter(|id| !id.contains('/')) else {
                return Route::NotFound;
            };
            if id.is_empty() {
                return Route::NotFound;
            }
            let id = id.to_string();
            match *method {
                Method::GET => api(ApiRoute::GetUser(id)),
                Method::PUT => api(ApiRoute::UpdateUser(id)),
                Method::DELETE => api(ApiRoute::DeleteUser(id)),
                _ => Route::MethodNotAllowed,
            }
        }
    }
}

/// Inputs of one request: query string pairs and an optional JSON object body
#[derive(Debug, Default)]
struct Params {
    query: Vec<(String, String)>,
    body: Map<String, Value>,
}

impl Params {
    fn parse(query: Option<&str>, body: &[u8]) -> Result<Self, GatewayError> {
        let query = match query {
            Some(q) => serde_urlencoded::from_str::<Vec<(String, String)>>(q)
                .map_err(|e| GatewayError::InvalidInput(format!("query string inválida: {e}")))?,
            None => Vec::new(),
        };

        let body = if body.iter().all(u8::is_ascii_whitespace) {
            Map::new()
        } else {
            serde_json::from_slice::<Map<String, Value>>(body)
                .map_err(|e| GatewayError::InvalidInput(format!("corpo JSON inválido: {e}")))?
        };

        Ok(Self { query, body })
    }

    /// Query string wins over the body; only scalar body values count
    fn get(&self, key: &str) -> Option<String> {
        if let Some((_, value)) = self.query.iter().find(|(k, _)| k == key) {
            return Some(value.clone());
        }
        match self.body.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn required(&self, key: &str) -> Result<String, GatewayError> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(GatewayError::InvalidInput(format!("campo obrigatório ausente: {key}"))),
        }
    }

    fn optional_int(&self, key: &str) -> Result<Option<i64>, GatewayError> {
        self.get(key)
            .map(|value| {
                value.trim().parse::<i64>().map_err(|_| {
                    GatewayError::InvalidInput(format!("{key} deve ser um número inteiro"))
                })
            })
            .transpose()
    }
}

fn parse_user_id(raw: &str) -> Result<UserId, GatewayError> {
    raw.parse::<i64>()
        .map(UserId)
        .map_err(|_| GatewayError::InvalidInput("id deve ser um número inteiro".to_string()))
}

fn build_response(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<ResponseBody> {
    match serde_json::to_vec(value) {
        Ok(body) => build_response(status, JSON, Bytes::from(body)),
        Err(e) => {
            error!(error = %e, "response_encode_failed");
            build_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                JSON,
                Bytes::from_static(br#"{"detail":"Internal Server Error"}"#),
            )
        }
    }
}

fn detail_response(status: StatusCode, detail: &str) -> Response<ResponseBody> {
    json_response(status, &json!({ "detail": detail }))
}

fn error_response(err: &GatewayError) -> Response<ResponseBody> {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!(kind = err.kind(), status = %status.as_u16(), error = %err, "request_failed");
    } else {
        warn!(kind = err.kind(), status = %status.as_u16(), error = %err, "request_rejected");
    }

    json_response(status, &json!({ "detail": err.detail() }))
}

async fn read_body<B>(body: B) -> Result<Bytes, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| GatewayError::InvalidInput(format!("falha ao ler o corpo: {e}")))
}

async fn handle_api<B>(
    route: ApiRoute,
    req: Request<B>,
    gateway: &GatewayHandler,
) -> Result<Response<ResponseBody>, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let query = req.uri().query().map(str::to_string);
    let body = read_body(req.into_body()).await?;
    let params = Params::parse(query.as_deref(), &body)?;

    let response = match route {
        ApiRoute::CreateUser => {
            let request = UserCreateRequest {
                name: params.required("nome")?,
                email: params.required("email")?,
                postal_code: params.required("cep")?,
            };
            json_response(StatusCode::OK, &gateway.create_user(request).await?)
        }
        ApiRoute::ListUsers => {
            let page = PageRequest::from_optional(
                params.optional_int("page")?,
                params.optional_int("perPage")?,
            );
            json_response(StatusCode::OK, &gateway.list_users(page).await?)
        }
        ApiRoute::GetUser(id) => {
            let id = parse_user_id(&id)?;
            json_response(StatusCode::OK, &gateway.get_user(id).await?)
        }
        ApiRoute::UpdateUser(id) => {
            let id = parse_user_id(&id)?;
            let request =
                UserUpdateRequest { name: params.required("nome")?, email: params.required("email")? };
            json_response(StatusCode::OK, &gateway.update_user(id, request).await?)
        }
        ApiRoute::DeleteUser(id) => {
            let id = parse_user_id(&id)?;
            json_response(StatusCode::OK, &gateway.delete_user(id).await?)
        }
    };

    Ok(response)
}

async fn dispatch<B>(
    req: Request<B>,
    gateway: &GatewayHandler,
    metrics: &Metrics,
) -> Response<ResponseBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match match_route(req.method(), req.uri().path()) {
        Route::Api(route) => {
            metrics.record_request(route.operation());
            let response = match handle_api(route, req, gateway).await {
                Ok(response) => response,
                Err(e) => error_response(&e),
            };
            metrics.record_response(response.status().as_u16());
            response
        }
        Route::Health => build_response(StatusCode::OK, "text/plain", Bytes::from_static(b"ok")),
        Route::Metrics => build_response(
            StatusCode::OK,
            prometheus::CONTENT_TYPE,
            Bytes::from(prometheus::format_prometheus_metrics(metrics)),
        ),
        Route::MethodNotAllowed => {
            detail_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
        }
        Route::NotFound => detail_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// Handle one HTTP request end to end.
///
/// Generic over the body so tests can drive it without a socket.
pub async fn handle_request<B>(
    req: Request<B>,
    gateway: Arc<GatewayHandler>,
    metrics: Arc<Metrics>,
) -> Result<Response<ResponseBody>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let start = Instant::now();
    let request_id = Uuid::now_v7();
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path()
    );

    let mut response = dispatch(req, &gateway, &metrics).instrument(span.clone()).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }

    span.in_scope(|| {
        debug!(
            status = %response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "request_completed"
        );
    });

    Ok(response)
}

/// Bind the configured address and serve until shutdown
pub async fn start_server(
    config: &Config,
    gateway: Arc<GatewayHandler>,
    metrics: Arc<Metrics>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("{}:{}", config.bind_address(), config.port());
    let listener = TcpListener::bind(&addr).await?;
    serve(listener, gateway, metrics, shutdown).await
}

/// Accept connections on an already bound listener until shutdown
pub async fn serve(
    listener: TcpListener,
    gateway: Arc<GatewayHandler>,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!(addr = %listener.local_addr()?, "http_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let gateway = gateway.clone();
                        let metrics = metrics.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                handle_request(req, gateway.clone(), metrics.clone())
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                debug!(error = %e, "http_connection_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "http_accept_error");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("http_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}
