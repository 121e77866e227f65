//! Authenticate with login identifier and password.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::account::Session;
use crate::router::Valid;
use crate::{AppState, ServerError};

#[derive(Debug, Validate, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(length(min = 1, message = "User ID is required."))]
    pub user_id: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Session>, ServerError> {
    let session = state
        .accounts
        .authenticate(&body.user_id, &body.password)
        .await?;

    Ok(Json(session))
}
