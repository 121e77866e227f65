//! Register a new account.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::account::NewAccount;
use crate::router::{OK, Valid};
use crate::{AppState, ServerError};

#[derive(Debug, Validate, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(length(
        min = 2,
        max = 64,
        message = "User ID must be between 2 and 64 characters."
    ))]
    pub user_id: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    pub password: String,
    #[validate(length(
        min = 1,
        max = 50,
        message = "Name must be between 1 and 50 characters."
    ))]
    pub name: String,
    #[validate(email(message = "Invalid email."))]
    pub email: String,
    #[validate(length(max = 255, message = "Comment is too long."))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: String,
    pub message: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>, ServerError> {
    state
        .accounts
        .signup(NewAccount {
            login_id: body.user_id.clone(),
            password: body.password.clone(),
            display_name: body.name.clone(),
            email: body.email.clone(),
            comment: body.comment.clone(),
        })
        .await?;

    Ok(Json(Response {
        status_code: OK.to_owned(),
        message: "signup succeeded".to_owned(),
    }))
}
