//! Anonymous cart identity.
//!
//! Visitors who aren't signed in get a random UUID in an HttpOnly cookie the
//! first time they write to a cart.

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use uuid::Uuid;

pub const GUEST_COOKIE_NAME: &str = "shop_guest";

const GUEST_COOKIE_DAYS: i64 = 30;

/// The guest token in the jar, if present and well-formed.
#[must_use]
pub fn guest_token(jar: &CookieJar) -> Option<Uuid> {
    jar.get(GUEST_COOKIE_NAME)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

#[must_use]
pub fn guest_cookie(token: Uuid, secure: bool) -> Cookie<'static> {
    Cookie::build((GUEST_COOKIE_NAME, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(GUEST_COOKIE_DAYS))
        .build()
}

/// A cookie that, when removed from the jar, forgets the guest.
#[must_use]
pub fn guest_removal_cookie() -> Cookie<'static> {
    Cookie::build((GUEST_COOKIE_NAME, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_token_roundtrip() {
        let token = Uuid::new_v4();
        let jar = CookieJar::new().add(guest_cookie(token, false));
        assert_eq!(guest_token(&jar), Some(token));
    }

    #[test]
    fn test_malformed_guest_token_is_ignored() {
        let jar = CookieJar::new().add(Cookie::new(GUEST_COOKIE_NAME, "not-a-uuid"));
        assert_eq!(guest_token(&jar), None);
    }
}
