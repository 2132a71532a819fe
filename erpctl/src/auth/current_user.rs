use crate::{
    AppState,
    api::models::profiles::CurrentUser,
    auth::session,
    config::Config,
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::{debug, instrument, trace};

/// Extract the session from the `Authorization: Bearer` header if present
/// Returns:
/// - None: No Authorization header or not a Bearer token
/// - Some(Ok(user)): Valid token found and verified
/// - Some(Err(error)): Bearer token present but invalid or expired
#[instrument(skip(parts, config))]
fn try_bearer_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let auth_header = parts.headers.get(header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => return Some(Err(Error::bad_request(format!("Invalid authorization header: {e}")))),
    };
    let token = auth_str.strip_prefix("Bearer ")?;

    Some(session::verify_session_token(token.trim(), config))
}

/// Extract the session from the session cookie if present and valid
/// Returns:
/// - None: No session cookie present
/// - Some(Ok(user)): Valid JWT found and verified
/// - Some(Err(error)): Cookie header unreadable, or every session cookie failed verification
#[instrument(skip(parts, config))]
fn try_cookie_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => return Some(Err(Error::bad_request(format!("Invalid cookie header: {e}")))),
    };
    let cookie_name = &config.auth.session.cookie_name;

    let mut last_error = None;
    for cookie in cookie_str.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=') {
            if name == cookie_name {
                match session::verify_session_token(value, config) {
                    Ok(user) => return Some(Ok(user)),
                    // Expired tokens are expected; keep looking in case a newer cookie follows
                    Err(e) => last_error = Some(e),
                }
            }
        }
    }
    last_error.map(Err)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Bearer first (API clients), then the browser cookie. A bad bearer token does not hide a
        // valid cookie.
        let mut attempted = false;

        match try_bearer_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!(profile_id = %user.id, "Authenticated via bearer token");
                return Ok(user);
            }
            Some(Err(e)) => {
                trace!("Bearer authentication failed: {:?}", e);
                attempted = true;
            }
            None => trace!("No bearer token"),
        }

        match try_cookie_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!(profile_id = %user.id, "Authenticated via session cookie");
                return Ok(user);
            }
            Some(Err(e)) => {
                trace!("Cookie authentication failed: {:?}", e);
                attempted = true;
            }
            None => trace!("No session cookie"),
        }

        Err(Error::Unauthenticated {
            message: attempted.then(|| "Session is invalid or has expired".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::profiles::Role;
    use crate::test_utils::{create_test_config, create_test_state};
    use uuid::Uuid;

    fn parts_with(header_name: &str, value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/api/v1/me")
            .header(header_name, value)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    fn user() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            email: "owner@example.com".into(),
            full_name: "Owner".into(),
            role: Role::Owner,
        }
    }

    #[tokio::test]
    async fn test_bearer_token() {
        let state = create_test_state();
        let user = user();
        let token = session::create_session_token(&user, &state.config).unwrap();

        let mut parts = parts_with("authorization", &format!("Bearer {token}"));
        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted.id, user.id);
        assert_eq!(extracted.company_id, user.company_id);
    }

    #[tokio::test]
    async fn test_cookie_among_others() {
        let state = create_test_state();
        let user = user();
        let token = session::create_session_token(&user, &state.config).unwrap();

        let cookie = format!("theme=dark; {}={token}; other=1", state.config.auth.session.cookie_name);
        let mut parts = parts_with("cookie", &cookie);
        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted.email, "owner@example.com");
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let state = create_test_state();
        let mut parts = parts_with("x-unrelated", "1");
        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { message: None }));
    }

    #[tokio::test]
    async fn test_invalid_bearer_falls_back_to_cookie() {
        let state = create_test_state();
        let token = session::create_session_token(&user(), &state.config).unwrap();

        let request = axum::http::Request::builder()
            .uri("http://localhost/api/v1/me")
            .header("authorization", "Bearer garbage")
            .header("cookie", format!("{}={token}", state.config.auth.session.cookie_name))
            .body(())
            .unwrap();
        let mut parts = request.into_parts().0;
        assert!(CurrentUser::from_request_parts(&mut parts, &state).await.is_ok());
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret() {
        let state = create_test_state();
        let mut other = create_test_config();
        other.secret_key = Some("another-secret".into());
        let token = session::create_session_token(&user(), &other).unwrap();

        let mut parts = parts_with("authorization", &format!("Bearer {token}"));
        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.user_message(), "Session is invalid or has expired");
    }
}
