use chrono::Utc;
use time::{Duration, OffsetDateTime};
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

use crate::models::jwt::IssuedTokens;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
const HTTP_ONLY: bool = true;
const SAME_SITE: SameSite = SameSite::Strict;

#[derive(Clone, Copy)]
pub struct CookieService {
    secure: bool,
}

impl CookieService {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    pub fn set_auth_cookies(&self, cookies: &Cookies, tokens: &IssuedTokens) {
        let now = Utc::now().timestamp();

        cookies.add(self.create_cookie(
            ACCESS_TOKEN_COOKIE,
            &tokens.access_token,
            Duration::seconds(tokens.access_expires_at - now),
        ));
        cookies.add(self.create_cookie(
            REFRESH_TOKEN_COOKIE,
            &tokens.refresh_token,
            Duration::seconds(tokens.refresh_expires_at - now),
        ));
    }

    pub fn clear_auth_cookies(&self, cookies: &Cookies) {
        cookies.add(self.create_removal_cookie(ACCESS_TOKEN_COOKIE));
        cookies.add(self.create_removal_cookie(REFRESH_TOKEN_COOKIE));
    }

    pub fn access_token(cookies: &Cookies) -> Option<String> {
        non_empty(cookies.get(ACCESS_TOKEN_COOKIE))
    }

    pub fn refresh_token(cookies: &Cookies) -> Option<String> {
        non_empty(cookies.get(REFRESH_TOKEN_COOKIE))
    }

    fn create_cookie(&self, name: &'static str, value: &str, max_age: Duration) -> Cookie<'static> {
        let expires = OffsetDateTime::now_utc() + max_age;

        Cookie::build((name, value.to_string()))
            .secure(self.secure)
            .http_only(HTTP_ONLY)
            .same_site(SAME_SITE)
            .path("/")
            .max_age(max_age)
            .expires(expires)
            .build()
    }

    fn create_removal_cookie(&self, name: &'static str) -> Cookie<'static> {
        Cookie::build((name, ""))
            .secure(self.secure)
            .http_only(HTTP_ONLY)
            .same_site(SAME_SITE)
            .path("/")
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::now_utc() - Duration::days(1))
            .build()
    }
}

fn non_empty(cookie: Option<Cookie<'_>>) -> Option<String> {
    cookie
        .map(|c| c.value().to_string())
        .filter(|value| !value.is_empty())
}
