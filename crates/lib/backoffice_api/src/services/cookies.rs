//! Cookie service: set and clear the httpOnly session cookies.
//!
//! Setting and clearing share one attribute set so browsers match the
//! cookies they are asked to drop.

use axum_extra::extract::cookie::{Cookie, SameSite};
use backoffice_core::auth::jwt::{ACCESS_TOKEN_EXPIRY_SECS, REFRESH_TOKEN_EXPIRY_SECS};
use time::Duration;

use crate::config::ApiConfig;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "bo_access";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "bo_refresh";

/// Builds session cookies with environment-dependent attributes.
#[derive(Debug, Clone)]
pub struct CookieBinder {
    secure: bool,
    same_site: SameSite,
    domain: Option<String>,
}

impl CookieBinder {
    /// Production cookies are `Secure; SameSite=None` for the cross-site
    /// frontend; everything else is `SameSite=Lax` over plain HTTP.
    pub fn from_config(config: &ApiConfig) -> Self {
        let production = config.is_production();
        Self {
            secure: production,
            same_site: if production {
                SameSite::None
            } else {
                SameSite::Lax
            },
            domain: config.cookie_domain.clone(),
        }
    }

    pub fn access_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(
            ACCESS_COOKIE,
            token.to_string(),
            Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS),
        )
    }

    pub fn refresh_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(
            REFRESH_COOKIE,
            token.to_string(),
            Duration::seconds(REFRESH_TOKEN_EXPIRY_SECS),
        )
    }

    pub fn clear_access(&self) -> Cookie<'static> {
        self.build(ACCESS_COOKIE, String::new(), Duration::ZERO)
    }

    pub fn clear_refresh(&self) -> Cookie<'static> {
        self.build(REFRESH_COOKIE, String::new(), Duration::ZERO)
    }

    fn build(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        let mut builder = Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .path("/")
            .max_age(max_age);
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }
}
