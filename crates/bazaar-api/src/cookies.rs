use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite, SignedCookieJar};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;

pub const SESSION_COOKIE: &str = "bazaar_session";
pub const FLASH_COOKIE: &str = "bazaar_flash";

pub fn session_token(jar: &SignedCookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

pub fn set_session(jar: SignedCookieJar, token: String) -> SignedCookieJar {
    jar.add(
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

pub fn clear_session(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Notices are base64url encoded so any text survives the cookie header.
pub fn set_flash(jar: CookieJar, message: &str) -> CookieJar {
    jar.add(
        Cookie::build((FLASH_COOKIE, B64.encode(message)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Read the pending notice, if any, and clear it.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };

    let message = B64
        .decode(cookie.value())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());

    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), message)
}
