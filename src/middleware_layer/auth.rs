use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::user::User,
    state::AppState,
};

/// Extracts the bearer token from the `Authorization` header.
///
/// # Arguments
///
/// * `headers` - The request headers.
///
/// # Returns
///
/// An `Option` containing the token if found.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// A middleware that requires a valid session token.
///
/// On success the freshly fetched `User` is inserted into the request
/// extensions; handlers authorize against it, never against token claims.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_bearer_token(request.headers()).ok_or_else(|| {
        tracing::debug!("❌ No bearer token found");
        AppError::Unauthenticated
    })?;

    let user = state
        .verifier
        .verify(token)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    tracing::debug!("✅ User authenticated: {}", user.id);

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// A middleware that requires the authenticated user to be an admin.
///
/// Must run after `require_auth`.
pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<User>()
        .ok_or(AppError::Unauthenticated)?;

    if !user.is_admin() {
        tracing::warn!("❌ Admin route refused for user: {}", user.id);
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_bearer_token(&headers_with("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer_token(&headers_with("bearer abc")), Some("abc"));
    }

    #[test]
    fn ignores_other_schemes_and_blanks() {
        assert_eq!(extract_bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(extract_bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(extract_bearer_token(&headers_with("abc")), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
