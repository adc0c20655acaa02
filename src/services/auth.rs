use crate::error::{AppError, AppResult};
use crate::models::user::AuthenticatedUser;

/// Resolves a bearer token to a user. Token issuance, credential storage and
/// password checks belong to the identity provider behind this trait.
pub trait SessionValidator: Send + Sync {
    fn validate(&self, token: &str) -> AppResult<AuthenticatedUser>;
}

const BEARER_SCHEME: &str = "bearer";

/// Strips an optional `Bearer` scheme (any case) and rejects empty tokens
/// before handing off to the validator. A bare scheme is not a token.
pub fn authenticate(
    validator: &dyn SessionValidator,
    authorization: Option<&str>,
) -> AppResult<AuthenticatedUser> {
    let raw = authorization
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::unauthorized("未提供访问令牌"))?;

    let token = match raw.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case(BEARER_SCHEME) => rest.trim(),
        None if raw.eq_ignore_ascii_case(BEARER_SCHEME) => "",
        _ => raw,
    };
    if token.is_empty() {
        return Err(AppError::unauthorized("访问令牌格式非法"));
    }

    validator.validate(token)
}
