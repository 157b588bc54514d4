//! # backoffice_api
//!
//! HTTP API library for the reservation backoffice.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::header::{CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use axum::http::{HeaderName, HeaderValue, Method, Request};
use axum::middleware::from_fn_with_state;
use axum::routing::{MethodRouter, get, patch, post};
use backoffice_core::auth::jwt::TokenCodec;
use backoffice_core::auth::session::SessionIssuer;
use backoffice_core::models::auth::Role;
use backoffice_core::store::{AuditStore, ReservationStore, UserStore};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::PropagateRequestIdLayer;
use tower_http::set_header::{SetRequestHeaderLayer, SetResponseHeaderLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, info_span, warn};
use uuid::Uuid;

use crate::config::{ApiConfig, ConfigError};
use crate::handlers::{admin, auth, health, reservations};
use crate::middleware::gate::{
    AuthGate, Authenticate, CSRF_HEADER, GateCheck, RequireCsrf, RequireRole, enforce,
};
use crate::middleware::rate_limit::{FixedWindowLimiter, limit_requests};
use crate::services::calendar::CalendarSync;
use crate::services::cookies::CookieBinder;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub codec: Arc<TokenCodec>,
    pub sessions: SessionIssuer,
    pub reservations: Arc<dyn ReservationStore>,
    pub audit: Arc<dyn AuditStore>,
    pub cookies: CookieBinder,
    pub calendar: CalendarSync,
    /// Login attempt counter, shared across requests.
    pub limiter: Arc<FixedWindowLimiter>,
}

impl AppState {
    /// Validate `config` and wire services over the given stores.
    pub fn new(
        config: ApiConfig,
        users: Arc<dyn UserStore>,
        reservations: Arc<dyn ReservationStore>,
        audit: Arc<dyn AuditStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let codec = Arc::new(TokenCodec::new(
            config.jwt_access_secret.as_bytes(),
            config.jwt_refresh_secret.as_bytes(),
        )?);
        Ok(Self {
            sessions: SessionIssuer::new(codec.clone(), users),
            cookies: CookieBinder::from_config(&config),
            calendar: CalendarSync::new(&config.calendar),
            limiter: Arc::new(FixedWindowLimiter::for_login(config.trusted_proxy_hops)),
            codec,
            reservations,
            audit,
            config,
        })
    }

    /// Wire every service over one store implementing all store traits.
    pub fn with_store<S>(config: ApiConfig, store: Arc<S>) -> Result<Self, ConfigError>
    where
        S: UserStore + ReservationStore + AuditStore + 'static,
    {
        Self::new(config, store.clone(), store.clone(), store)
    }

    fn authenticate(&self) -> Arc<dyn GateCheck> {
        Arc::new(Authenticate::new(self.codec.clone()))
    }
}

/// Mount an [`AuthGate`] running `checks` in order in front of `route`.
fn gated(
    route: MethodRouter<AppState>,
    checks: Vec<Arc<dyn GateCheck>>,
) -> MethodRouter<AppState> {
    route.layer(from_fn_with_state(Arc::new(AuthGate::new(checks)), enforce))
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let authenticated = || -> Vec<Arc<dyn GateCheck>> { vec![state.authenticate()] };
    let with_roles = |roles: &[Role], csrf: bool| -> Vec<Arc<dyn GateCheck>> {
        let mut checks = vec![
            state.authenticate(),
            Arc::new(RequireRole::new(roles.to_vec())) as Arc<dyn GateCheck>,
        ];
        if csrf {
            checks.push(Arc::new(RequireCsrf));
        }
        checks
    };

    let login: MethodRouter<AppState> =
        post(auth::login_handler).layer(from_fn_with_state(state.limiter.clone(), limit_requests));

    let routes = Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth/login", login)
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/logout", gated(post(auth::logout_handler), authenticated()))
        .route("/auth/me", gated(get(auth::me_handler), authenticated()))
        .route(
            "/reservations",
            gated(
                get(reservations::list_reservations_handler),
                with_roles(&Role::ALL, false),
            ),
        )
        .route(
            "/reservations/{id}",
            gated(
                patch(reservations::patch_reservation_handler),
                with_roles(&[Role::Admin, Role::Manager, Role::Staff], true),
            ),
        )
        .route(
            "/admin/users/{id}/revoke-sessions",
            gated(
                post(admin::revoke_sessions_handler),
                with_roles(&[Role::Admin], true),
            ),
        );

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    routes
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    request_id.clone(),
                    |_req: &Request<Body>| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors(&state.config))
                .layer(SetResponseHeaderLayer::if_not_present(
                    X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    REFERRER_POLICY,
                    HeaderValue::from_static("no-referrer"),
                )),
        )
        .with_state(state)
}

/// Credentialed CORS for the configured browser origins.
fn cors(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(CSRF_HEADER)])
        .allow_credentials(true)
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
