// Session cookie helpers shared by every proxy route.
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Console-side cookie holding the opaque backend token. HTTP-only so it
/// is never readable by client script.
pub const SESSION_COOKIE: &str = "wingsuite_session";

pub fn extract_session_token(jar: &CookieJar) -> Option<String> {
    let value = jar.get(SESSION_COOKIE)?.value().trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub fn session_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Removal cookie for logout; path must match the one set at login.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trimmed_token() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "  tok_123  "));
        assert_eq!(extract_session_token(&jar), Some("tok_123".to_string()));
    }

    #[test]
    fn empty_or_missing_cookie_yields_none() {
        let jar = CookieJar::new();
        assert_eq!(extract_session_token(&jar), None);

        let jar = jar.add(Cookie::new(SESSION_COOKIE, "   "));
        assert_eq!(extract_session_token(&jar), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("tok_123", true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "tok_123");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
