use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE, USER_AGENT},
};

use crate::error::AppError;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

const UNKNOWN_DEVICE: &str = "unknown";

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Bearer header wins over the cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| read_cookie(headers, ACCESS_COOKIE))
}

/// The session key for a request: its User-Agent, or a fixed placeholder.
pub fn device_info(headers: &HeaderMap) -> String {
    headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_DEVICE)
        .to_string()
}

pub fn set_cookie(
    name: &str,
    value: &str,
    max_age_secs: i64,
    secure: bool,
) -> Result<HeaderValue, AppError> {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|_| AppError::internal("Invalid cookie value"))
}

pub fn clear_cookie(name: &str, secure: bool) -> Result<HeaderValue, AppError> {
    set_cookie(name, "", 0, secure)
}

#[cfg(test)]
mod tests {
    use axum::http::{
        HeaderMap, HeaderValue,
        header::{AUTHORIZATION, COOKIE, USER_AGENT},
    };

    use super::{access_token, clear_cookie, device_info, read_cookie, set_cookie};

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; access_token=abc.def.ghi; refresh_token=r"),
        );

        assert_eq!(read_cookie(&headers, "access_token").as_deref(), Some("abc.def.ghi"));
        assert_eq!(read_cookie(&headers, "refresh_token").as_deref(), Some("r"));
        assert!(read_cookie(&headers, "missing").is_none());
    }

    #[test]
    fn bearer_header_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("access_token=from-cookie"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );

        assert_eq!(access_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn missing_user_agent_maps_to_placeholder_device() {
        let mut headers = HeaderMap::new();
        assert_eq!(device_info(&headers), "unknown");

        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        assert_eq!(device_info(&headers), "Mozilla/5.0");
    }

    #[test]
    fn cookies_are_http_only_and_lax() {
        let cookie = set_cookie("access_token", "t", 900, true).expect("cookie should build");
        let cleared = clear_cookie("access_token", false).expect("cookie should build");

        assert_eq!(
            cookie.to_str().expect("ascii"),
            "access_token=t; Path=/; HttpOnly; SameSite=Lax; Max-Age=900; Secure"
        );
        assert!(cleared.to_str().expect("ascii").contains("Max-Age=0"));
    }
}
