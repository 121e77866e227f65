//! Change password of the authenticated account.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::router::{Envelope, Valid};
use crate::token::Claims;
use crate::{AppState, ServerError};

#[derive(Debug, Validate, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(length(min = 1, message = "Current password is required."))]
    pub before_password: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    pub update_password: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Valid(body): Valid<Body>,
) -> Result<Json<Envelope<&'static str>>, ServerError> {
    state
        .accounts
        .change_password(&claims.sub, &body.before_password, &body.update_password)
        .await?;

    Ok(Envelope::ok("password updated"))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::*;

    #[tokio::test]
    async fn test_change_password_handler() {
        let state = test_state();
        let app = app(state.clone());
        let account = signup(&state, "testUserId").await;

        let response = make_request(
            Some((&state, account.id.as_str())),
            app.clone(),
            Method::PUT,
            "/api/profile/password",
            json!({ "beforePassword": "wrongPassword", "updatePassword": "newPassword" })
                .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = read_body(response).await;
        assert_eq!(body["errorMessage"], "passwords do not match");

        let response = make_request(
            Some((&state, account.id.as_str())),
            app,
            Method::PUT,
            "/api/profile/password",
            json!({ "beforePassword": TEST_PASSWORD, "updatePassword": "newPassword" })
                .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = read_body(response).await;
        assert_eq!(body["data"], "password updated");

        assert!(
            state
                .accounts
                .authenticate("testUserId", "newPassword")
                .await
                .is_ok()
        );
    }
}
