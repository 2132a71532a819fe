//! Sign-in, self-service registration and sign-out.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        auth::{AuthResponse, AuthSuccessResponse, LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse},
        companies::CompanyResponse,
        profiles::{CurrentUser, ProfileResponse, Role},
        require_text,
    },
    auth::{password, session},
    db::{
        handlers::{Companies, Profiles, Repository},
        models::{companies::CompanyCreateDBRequest, profiles::ProfileCreateDBRequest},
    },
    errors::{Error, Result},
};

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    }
}

/// Create a company together with its owner profile and sign the owner in.
#[utoipa::path(
    post,
    path = "/authentication/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "Company and owner created", body = AuthResponse),
        (status = 400, description = "Invalid input or registration disabled"),
        (status = 409, description = "Email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse> {
    if !state.config.auth.allow_registration {
        return Err(Error::bad_request("Registration is disabled"));
    }
    require_text("Company name", &request.company_name)?;
    require_text("Full name", &request.full_name)?;
    require_text("Email", &request.email)?;
    password::validate_length(&request.password, &state.config.auth.password)?;

    let email = request.email.trim().to_lowercase();
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    if Profiles::get_by_email(&mut tx, &email).await?.is_some() {
        return Err(Error::Conflict {
            message: "An account with this email address already exists".to_string(),
        });
    }

    let password_hash = password::hash_password(request.password, (&state.config.auth.password).into()).await?;

    let company = Companies::new(&mut tx)
        .create(&CompanyCreateDBRequest::new(request.company_name.trim(), Some(email.clone())))
        .await?;
    let profile = Profiles::new(&mut tx, company.id)
        .create(&ProfileCreateDBRequest {
            email,
            full_name: request.full_name.trim().to_string(),
            role: Role::Owner,
            password_hash: Some(password_hash),
        })
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    tracing::info!(company_id = %company.id, "Registered company");

    let token = session::create_session_token(&CurrentUser::from(profile.clone()), &state.config)?;
    let cookie = session::session_cookie(&token, &state.config);

    Ok(RegisterResponse {
        auth_response: AuthResponse {
            profile: ProfileResponse::from(profile),
            company: CompanyResponse::from(company),
            token,
            message: "Registration successful".to_string(),
        },
        cookie,
    })
}

#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let profile = Profiles::get_by_email(&mut conn, &request.email)
        .await?
        .ok_or_else(invalid_credentials)?;
    let hash = profile.password_hash.clone().ok_or_else(invalid_credentials)?;

    if !password::verify_password(request.password, hash).await? {
        return Err(invalid_credentials());
    }
    if !profile.active {
        return Err(Error::Unauthenticated {
            message: Some("This account has been deactivated".to_string()),
        });
    }

    Profiles::new(&mut conn, profile.company_id).touch_last_login(profile.id).await?;
    let company = Companies::new(&mut conn)
        .get(profile.company_id)
        .await?
        .ok_or_else(|| Error::not_found("Company", profile.company_id))?;

    let token = session::create_session_token(&CurrentUser::from(profile.clone()), &state.config)?;
    let cookie = session::session_cookie(&token, &state.config);

    Ok(LoginResponse {
        auth_response: AuthResponse {
            profile: ProfileResponse::from(profile),
            company: CompanyResponse::from(company),
            token,
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Clear the session cookie. Tokens are stateless and stay valid until they expire.
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse> {
    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie: session::clear_session_cookie(&state.config),
    })
}

#[cfg(test)]
mod tests {
    use crate::api::models::auth::AuthSuccessResponse;
    use crate::test_utils::{create_test_config, create_test_server};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn logout_clears_cookie() {
        let server = create_test_server(create_test_config());
        let response = server.post("/authentication/logout").await;

        response.assert_status_ok();
        let cookie = response.header("set-cookie");
        assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
        assert_eq!(response.json::<AuthSuccessResponse>().message, "Logout successful");
    }

    #[tokio::test]
    async fn registration_can_be_disabled() {
        let mut config = create_test_config();
        config.auth.allow_registration = false;
        let server = create_test_server(config);

        let response = server
            .post("/authentication/register")
            .json(&json!({
                "company_name": "Fix-It",
                "full_name": "Ana",
                "email": "ana@example.com",
                "password": "correct horse battery"
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<serde_json::Value>()["error"], "Registration is disabled");
    }

    #[tokio::test]
    async fn registration_rejects_short_password_before_touching_db() {
        let server = create_test_server(create_test_config());
        let response = server
            .post("/authentication/register")
            .json(&json!({
                "company_name": "Fix-It",
                "full_name": "Ana",
                "email": "ana@example.com",
                "password": "short"
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
