//! Session cookies: build, clear and read.
//!
//! Both cookies are `HttpOnly; SameSite=Strict`, plus `Secure` in production.
//! The refresh cookie is scoped to the refresh endpoint so the browser never
//! sends it anywhere else.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE, InvalidHeaderValue, SET_COOKIE},
};
use tracing::error;

use crate::session::AuthConfig;

pub(crate) const ACCESS_COOKIE_NAME: &str = "access_token";
pub(crate) const REFRESH_COOKIE_NAME: &str = "refresh_token";

fn cookie(
    name: &str,
    value: &str,
    path: &str,
    max_age: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{name}={value}; Path={path}; HttpOnly; SameSite=Strict; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn append(headers: &mut HeaderMap, value: Result<HeaderValue, InvalidHeaderValue>) {
    match value {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(err) => error!("Failed to build session cookie: {err}"),
    }
}

/// `Set-Cookie` headers for a freshly issued access token and, when given, a
/// refresh token.
pub(super) fn session_cookies(
    config: &AuthConfig,
    access_token: &str,
    refresh_token: Option<&str>,
) -> HeaderMap {
    let secure = config.secure_cookies();
    let mut headers = HeaderMap::new();
    append(
        &mut headers,
        cookie(
            ACCESS_COOKIE_NAME,
            access_token,
            "/",
            config.access_ttl_seconds(),
            secure,
        ),
    );
    if let Some(refresh_token) = refresh_token {
        append(
            &mut headers,
            cookie(
                REFRESH_COOKIE_NAME,
                refresh_token,
                &config.refresh_cookie_path(),
                config.refresh_ttl_seconds(),
                secure,
            ),
        );
    }
    headers
}

/// `Set-Cookie` headers that expire both session cookies.
pub(super) fn clear_session_cookies(config: &AuthConfig) -> HeaderMap {
    let secure = config.secure_cookies();
    let mut headers = HeaderMap::new();
    append(&mut headers, cookie(ACCESS_COOKIE_NAME, "", "/", 0, secure));
    append(
        &mut headers,
        cookie(
            REFRESH_COOKIE_NAME,
            "",
            &config.refresh_cookie_path(),
            0,
            secure,
        ),
    );
    headers
}

pub(super) fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        let val = val.trim();
        (key.trim() == name && !val.is_empty()).then(|| val.to_string())
    })
}

/// Access token from the cookie, falling back to an `Authorization: Bearer` header.
pub(super) fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, ACCESS_COOKIE_NAME).or_else(|| extract_bearer_token(headers))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Environment;
    use anyhow::Result;
    use secrecy::SecretString;

    fn config(environment: Environment) -> Result<AuthConfig> {
        Ok(
            AuthConfig::new(SecretString::from("secret".to_string()), 900, 86_400)?
                .with_environment(environment),
        )
    }

    fn set_cookies(headers: &HeaderMap) -> Vec<String> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok().map(ToString::to_string))
            .collect()
    }

    #[test]
    fn session_cookies_are_scoped_and_hardened() -> Result<()> {
        let headers = session_cookies(&config(Environment::Development)?, "acc", Some("ref"));
        let cookies = set_cookies(&headers);
        assert_eq!(
            cookies,
            vec![
                "access_token=acc; Path=/; HttpOnly; SameSite=Strict; Max-Age=900".to_string(),
                "refresh_token=ref; Path=/api/v1/auth/refresh; HttpOnly; SameSite=Strict; Max-Age=86400"
                    .to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn production_cookies_are_secure() -> Result<()> {
        let headers = session_cookies(&config(Environment::Production)?, "acc", None);
        let cookies = set_cookies(&headers);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].ends_with("; Secure"));
        Ok(())
    }

    #[test]
    fn clearing_expires_both_cookies() -> Result<()> {
        let cookies = set_cookies(&clear_session_cookies(&config(Environment::Development)?));
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|cookie| cookie.contains("Max-Age=0")));
        assert!(cookies[0].starts_with("access_token=;"));
        assert!(cookies[1].starts_with("refresh_token=;"));
        Ok(())
    }

    #[test]
    fn reads_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; refresh_token=abc.def.ghi; access_token="),
        );
        assert_eq!(
            read_cookie(&headers, REFRESH_COOKIE_NAME).as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(read_cookie(&headers, ACCESS_COOKIE_NAME), None);
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn access_token_falls_back_to_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(extract_access_token(&headers).as_deref(), Some("tok"));

        headers.insert(COOKIE, HeaderValue::from_static("access_token=cookie-tok"));
        assert_eq!(extract_access_token(&headers).as_deref(), Some("cookie-tok"));
    }
}
