//! Withdraw an account. Its posts are kept.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

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

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub message: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>, ServerError> {
    state
        .accounts
        .withdraw(&body.user_id, &body.password)
        .await?;

    Ok(Json(Response {
        message: "withdrawal succeeded".to_owned(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::*;

    async fn withdraw(app: axum::Router, user_id: &str, password: &str) -> axum::response::Response {
        make_request(
            None,
            app,
            Method::PATCH,
            "/api/deletemembers",
            json!({ "userId": user_id, "password": password }).to_string(),
        )
        .await
    }

    #[tokio::test]
    async fn test_withdraw_handler() {
        let state = test_state();
        let app = app(state.clone());
        signup(&state, "testUserId").await;

        let response = withdraw(app.clone(), "testUserId", TEST_PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = read_body(response).await;
        assert_eq!(body["message"], "withdrawal succeeded");

        let response = withdraw(app.clone(), "testUserId", TEST_PASSWORD).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = read_body(response).await;
        assert_eq!(body["errorMessage"], "user already withdrawn");

        let response = make_request(
            None,
            app,
            Method::POST,
            "/api/login",
            json!({ "userId": "testUserId", "password": TEST_PASSWORD }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_withdraw_unknown_user() {
        let state = test_state();
        let app = app(state);

        let response = withdraw(app, "nonExistingUser", "testPassword").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: Value = read_body(response).await;
        assert_eq!(body["errorCode"], "404");
        assert_eq!(body["errorMessage"], "user not found");
    }

    #[tokio::test]
    async fn test_withdraw_wrong_password() {
        let state = test_state();
        let app = app(state.clone());
        signup(&state, "testUserId").await;

        let response = withdraw(app, "testUserId", "wrongPassword").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = read_body(response).await;
        assert_eq!(body["errorCode"], "400");
        assert_eq!(body["errorMessage"], "login id and password do not match");
    }
}
