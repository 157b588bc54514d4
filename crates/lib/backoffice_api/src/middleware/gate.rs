//! Auth gate: an ordered pipeline of checks over a request-scoped context.
//!
//! Each route mounts the checks it needs, e.g.
//! `[Authenticate, RequireRole([ADMIN]), RequireCsrf]`. The first failing
//! check short-circuits; on success the verified [`Identity`] is inserted
//! into the request extensions for handlers to extract.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use backoffice_core::auth::jwt::TokenCodec;
use backoffice_core::models::auth::{Identity, Role};
use tracing::debug;

use crate::error::AppError;
use crate::services::cookies::ACCESS_COOKIE;

/// Header carrying the CSRF nonce on unsafe requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Request data the checks read, plus the identity they establish.
#[derive(Debug, Clone)]
pub struct GateContext {
    pub method: Method,
    pub access_token: Option<String>,
    pub csrf_header: Option<String>,
    pub identity: Option<Identity>,
}

/// One step of the gate.
pub trait GateCheck: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &mut GateContext) -> Result<(), AppError>;
}

/// Verifies the access cookie and populates the identity.
#[derive(Debug, Clone)]
pub struct Authenticate {
    codec: Arc<TokenCodec>,
}

impl Authenticate {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

impl GateCheck for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn check(&self, ctx: &mut GateContext) -> Result<(), AppError> {
        let token = ctx
            .access_token
            .as_deref()
            .ok_or(AppError::Unauthenticated)?;
        let claims = self.codec.verify_access(token)?;
        ctx.identity = Some(Identity::from(claims));
        Ok(())
    }
}

/// Allows only the listed roles.
#[derive(Debug, Clone)]
pub struct RequireRole {
    allowed: Vec<Role>,
}

impl RequireRole {
    pub fn new(allowed: impl Into<Vec<Role>>) -> Self {
        Self {
            allowed: allowed.into(),
        }
    }
}

impl GateCheck for RequireRole {
    fn name(&self) -> &'static str {
        "require_role"
    }

    fn check(&self, ctx: &mut GateContext) -> Result<(), AppError> {
        let identity = ctx.identity.as_ref().ok_or(AppError::Unauthenticated)?;
        if self.allowed.contains(&identity.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Requires `x-csrf-token` to equal the nonce bound into the access token
/// on state-changing methods. Skipped when no identity is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireCsrf;

fn is_unsafe(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

impl GateCheck for RequireCsrf {
    fn name(&self) -> &'static str {
        "require_csrf"
    }

    fn check(&self, ctx: &mut GateContext) -> Result<(), AppError> {
        if !is_unsafe(&ctx.method) {
            return Ok(());
        }
        let Some(identity) = &ctx.identity else {
            return Ok(());
        };
        match ctx.csrf_header.as_deref() {
            Some(header) if header == identity.csrf_nonce => Ok(()),
            _ => Err(AppError::CsrfInvalid),
        }
    }
}

/// Ordered list of checks mounted on a route.
#[derive(Clone)]
pub struct AuthGate {
    checks: Vec<Arc<dyn GateCheck>>,
}

impl AuthGate {
    pub fn new(checks: Vec<Arc<dyn GateCheck>>) -> Self {
        Self { checks }
    }

    /// Run every check in order, stopping at the first failure.
    pub fn run(&self, ctx: &mut GateContext) -> Result<(), AppError> {
        for check in &self.checks {
            if let Err(e) = check.check(ctx) {
                debug!(check = check.name(), error = %e, "gate rejected request");
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Axum middleware running an [`AuthGate`].
pub async fn enforce(
    State(gate): State<Arc<AuthGate>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let mut ctx = GateContext {
        method: request.method().clone(),
        access_token: jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()),
        csrf_header: request
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        identity: None,
    };
    gate.run(&mut ctx)?;

    if let Some(identity) = ctx.identity {
        request.extensions_mut().insert(identity);
    }
    Ok(next.run(request).await)
}
