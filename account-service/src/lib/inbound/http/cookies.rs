use auth::TokenPair;
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::cookie::CookieJar;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Attach both tokens as `HttpOnly; Secure` cookies.
pub fn with_token_cookies(jar: CookieJar, tokens: &TokenPair) -> CookieJar {
    jar.add(token_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone()))
        .add(token_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone()))
}

/// Expire both token cookies (logout).
pub fn without_token_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(token_cookie(ACCESS_TOKEN_COOKIE, String::new()))
        .remove(token_cookie(REFRESH_TOKEN_COOKIE, String::new()))
}

fn token_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .path("/")
        .build()
}
