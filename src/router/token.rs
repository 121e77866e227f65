//! Get a new token with refresh token.

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
    #[validate(length(min = 1, message = "Account ID is required."))]
    pub account_id: String,
    #[validate(length(equal = crate::crypto::TOKEN_LENGTH_RULE, message = "Invalid refresh token."))]
    pub refresh_token: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Session>, ServerError> {
    let session = state
        .accounts
        .refresh(&body.account_id, &body.refresh_token)
        .await?;

    Ok(Json(session))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::*;

    #[tokio::test]
    async fn test_refresh_token_handler() {
        let state = test_state();
        let app = app(state.clone());
        signup(&state, "testUserId").await;
        let session = state
            .accounts
            .authenticate("testUserId", TEST_PASSWORD)
            .await
            .unwrap();

        let request = json!({
            "accountId": session.account_id,
            "refreshToken": session.refresh_token,
        })
        .to_string();

        let response = make_request(
            None,
            app.clone(),
            Method::POST,
            "/api/token",
            request.clone(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = read_body(response).await;
        assert_ne!(body["refreshToken"], session.refresh_token.as_str());

        // Refresh tokens are single use.
        let response =
            make_request(None, app, Method::POST, "/api/token", request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body: Value = read_body(response).await;
        assert_eq!(body["errorCode"], "401");
    }

    #[tokio::test]
    async fn test_malformed_refresh_token() {
        let state = test_state();
        let app = app(state.clone());
        let account = signup(&state, "testUserId").await;

        let response = make_request(
            None,
            app,
            Method::POST,
            "/api/token",
            json!({ "accountId": account.id, "refreshToken": "short" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = read_body(response).await;
        assert_eq!(body["errors"][0]["field"], "refresh_token");
        assert_eq!(body["errors"][0]["message"], "Invalid refresh token.");
    }
}
