//! Newsfeed manages account identity and lifecycle of a social feed.
#![forbid(unsafe_code)]

pub mod account;
pub mod config;
pub mod crypto;
mod database;
pub mod error;
mod middleware;
mod router;
pub mod telemetry;
pub mod token;

use std::sync::Arc;
use std::time::Duration;

use account::{
    AccountRepository, AccountService, MemoryAccountRepository, PostgresAccountRepository,
    SystemClock,
};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Router, middleware as AxumMiddleware};
use error::ServerError;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};

const TOKEN_SECRET_ENV: &str = "TOKEN_SECRET";
const PEPPER_ENV: &str = "PEPPER";

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub accounts: AccountService,
    pub token: token::TokenManager,
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::PUT, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `GET /metrics` goes to `metrics`.
        .route("/metrics", get(render_metrics))
        .nest("/api", router::router(state.clone()))
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Prometheus exposition.
async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, String::default()),
    }
}

/// Initialize the application state.
pub async fn initialize_state(
    metrics: Option<PrometheusHandle>,
) -> Result<AppState, Box<dyn std::error::Error>> {
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let repo: Arc<dyn AccountRepository> = match &config.postgres {
        Some(postgres) => {
            let db = database::Database::from_config(postgres).await?;

            // execute migrations scripts on start.
            sqlx::migrate!().run(&db.postgres).await?;

            Arc::new(PostgresAccountRepository::new(db.postgres))
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, accounts are kept in memory"
            );
            Arc::new(MemoryAccountRepository::new())
        },
    };

    let pepper = std::env::var(PEPPER_ENV)
        .map_err(|_| format!("missing `{PEPPER_ENV}` environment variable"))?;
    let crypto = Arc::new(crypto::Crypto::new(config.argon2.clone(), pepper)?);

    // handle jwt.
    let token_config = config.token.clone().unwrap_or_default();
    let secret = std::env::var(TOKEN_SECRET_ENV)
        .ok()
        .or(token_config.secret)
        .ok_or_else(|| {
            format!("missing `{TOKEN_SECRET_ENV}` environment variable or `token.secret` entry")
        })?;

    let mut token = token::TokenManager::new(&config.url, secret)?;
    if let Some(minutes) = token_config.ttl_minutes {
        token = token.ttl_minutes(minutes)?;
    }
    if let Some(audience) = &token_config.audience {
        token = token.audience(audience);
    }

    let accounts =
        AccountService::new(repo, crypto, token.clone(), Arc::new(SystemClock));

    Ok(AppState {
        config,
        accounts,
        token,
        metrics,
    })
}

/// Password of accounts created by [`signup`].
#[cfg(test)]
pub(crate) const TEST_PASSWORD: &str = "StRong_PaÂ§$W0rD";

/// State backed by an in-memory store and cheap Argon2 parameters.
#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    let crypto = Arc::new(crypto::Crypto::new(Some(crypto::fast_config()), "pepper").unwrap());
    let token = token::TokenManager::new("https://feed.example.com/", "secret").unwrap();

    AppState {
        config: Arc::new(config::Configuration::default()),
        accounts: AccountService::new(
            Arc::new(MemoryAccountRepository::new()),
            crypto,
            token.clone(),
            Arc::new(SystemClock),
        ),
        token,
        metrics: None,
    }
}

#[cfg(test)]
pub(crate) async fn signup(state: &AppState, login_id: &str) -> account::Account {
    state
        .accounts
        .signup(account::NewAccount {
            login_id: login_id.to_owned(),
            password: TEST_PASSWORD.to_owned(),
            display_name: "Test User".to_owned(),
            email: "test@example.com".to_owned(),
            comment: Some("hello".to_owned()),
        })
        .await
        .unwrap()
}

#[cfg(test)]
pub(crate) async fn read_body<T: serde::de::DeserializeOwned>(
    response: axum::response::Response,
) -> T {
    use http_body_util::BodyExt;

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// MUST NEVER be used in production.
///
/// `auth` carries the state issuing the bearer token and the account ID.
#[cfg(test)]
pub(crate) async fn make_request(
    auth: Option<(&AppState, &str)>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some((state, account_id)) = auth {
        let token = state
            .token
            .issue(account_id, account::Role::User)
            .expect("cannot create JWT");
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::util::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let response =
            make_request(None, app(test_state()), Method::GET, "/metrics", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_bearer_token() {
        let state = test_state();
        let foreign = token::TokenManager::new("https://feed.example.com/", "other secret")
            .unwrap()
            .issue("account", account::Role::User)
            .unwrap();

        let response = app(state)
            .oneshot(
                axum::extract::Request::builder()
                    .uri("/api/profile")
                    .header(header::AUTHORIZATION, format!("Bearer {foreign}"))
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = read_body(response).await;
        assert_eq!(body["errorCode"], "401");
    }
}
