//! Read and update the authenticated profile.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::account::{Profile, ProfileUpdate};
use crate::router::{Envelope, Valid};
use crate::token::Claims;
use crate::{AppState, ServerError};

#[derive(Debug, Default, Validate, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Name must be between 1 and 50 characters."
    ))]
    pub name: Option<String>,
    #[validate(length(max = 255, message = "Comment is too long."))]
    pub comment: Option<String>,
}

pub async fn get(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Envelope<Profile>>, ServerError> {
    let account = state.accounts.profile(&claims.sub).await?;
    Ok(Envelope::ok(account.profile()))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Valid(body): Valid<Body>,
) -> Result<Json<Envelope<Profile>>, ServerError> {
    let account = state
        .accounts
        .update_profile(&claims.sub, ProfileUpdate {
            display_name: body.name,
            comment: body.comment,
        })
        .await?;

    Ok(Envelope::ok(account.profile()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::*;

    #[tokio::test]
    async fn test_get_profile() {
        let state = test_state();
        let app = app(state.clone());
        let account = signup(&state, "testUserId").await;

        let response = make_request(
            Some((&state, account.id.as_str())),
            app.clone(),
            Method::GET,
            "/api/profile",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = read_body(response).await;
        assert_eq!(body["status"], "200");
        assert_eq!(body["error"], Value::Null);
        assert_eq!(body["data"]["userId"], "testUserId");
        assert_eq!(body["data"]["status"], "ACTIVE");
        assert!(body["data"].get("password").is_none());
        assert!(body["data"].get("refreshToken").is_none());

        // No token.
        let response =
            make_request(None, app, Method::GET, "/api/profile", String::default()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let state = test_state();
        let app = app(state.clone());
        let account = signup(&state, "testUserId").await;

        let response = make_request(
            Some((&state, account.id.as_str())),
            app.clone(),
            Method::PATCH,
            "/api/profile",
            json!({ "name": "Updated User" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = read_body(response).await;
        assert_eq!(body["data"]["name"], "Updated User");
        assert_eq!(body["data"]["comment"], "hello");

        let response = make_request(
            Some((&state, account.id.as_str())),
            app,
            Method::PATCH,
            "/api/profile",
            json!({ "name": "" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_profile_of_withdrawn_account() {
        let state = test_state();
        let app = app(state.clone());
        let account = signup(&state, "testUserId").await;
        state
            .accounts
            .withdraw("testUserId", TEST_PASSWORD)
            .await
            .unwrap();

        // The access token outlives the account.
        let response = make_request(
            Some((&state, account.id.as_str())),
            app,
            Method::GET,
            "/api/profile",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = read_body(response).await;
        assert_eq!(body["errorMessage"], "user already withdrawn");
    }
}
