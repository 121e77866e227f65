//! Account HTTP API.
pub mod login;
pub mod password;
pub mod profile;
pub mod signup;
pub mod status;
pub mod token;
pub mod withdraw;

use axum::extract::{FromRequest, Request};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router, middleware};
use serde::Serialize;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{AppState, ServerError};

pub const OK: &str = "200";

/// JSON body, validated before reaching the handler.
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Envelope of authenticated profile endpoints.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    status: &'static str,
    data: T,
    error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            status: OK,
            data,
            error: None,
        })
    }
}

pub fn router(state: AppState) -> Router<AppState> {
    let authenticated = Router::new()
        // `GET /api/profile` goes to `get`.
        .route("/profile", get(profile::get).patch(profile::update))
        // `PUT /api/profile/password` goes to `password`.
        .route("/profile/password", put(password::handler))
        .route_layer(middleware::from_fn_with_state(state, crate::middleware::auth));

    Router::new()
        // `POST /api/signup` goes to `signup`.
        .route("/signup", post(signup::handler))
        // `POST /api/login` goes to `login`.
        .route("/login", post(login::handler))
        // `POST /api/token` goes to `token`.
        .route("/token", post(token::handler))
        // `PATCH /api/deletemembers` goes to `withdraw`.
        .route("/deletemembers", patch(withdraw::handler))
        .merge(authenticated)
}
