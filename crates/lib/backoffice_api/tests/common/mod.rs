//! Shared fixtures for router-level tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use backoffice_api::AppState;
use backoffice_api::config::{ApiConfig, CalendarConfig, Environment};
use backoffice_core::models::auth::{Role, User};
use backoffice_core::models::reservation::{ContactSummary, Reservation, ReservationStatus};
use backoffice_core::store::MemoryStore;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "ChangeMe123!";
pub const ACCESS_SECRET: &str = "test-access-secret";
pub const REFRESH_SECRET: &str = "test-refresh-secret";

pub fn config(environment: Environment) -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        environment,
        jwt_access_secret: ACCESS_SECRET.into(),
        jwt_refresh_secret: REFRESH_SECRET.into(),
        cookie_domain: None,
        cors_origins: vec!["http://localhost:3000".into()],
        trusted_proxy_hops: 0,
        calendar: CalendarConfig::default(),
    }
}

/// A router over an in-memory store seeded with two tenants.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
    pub tenant_id: Uuid,
    pub other_tenant_id: Uuid,
    pub admin: User,
    pub manager: User,
    pub staff: User,
    pub accounting: User,
    /// Admin of the other tenant.
    pub outsider: User,
    pub reservation: Reservation,
    pub other_reservation: Reservation,
}

/// Cookies and nonce from a login or refresh.
#[derive(Debug, Clone)]
pub struct Session {
    pub access: String,
    pub refresh: String,
    pub csrf: String,
}

/// A response with its body decoded as JSON (`Null` when empty).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Value of the `name` cookie set by this response, if any.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookie(name)
            .and_then(|raw| raw.split(';').next().map(str::to_string))
            .and_then(|pair| pair.split_once('=').map(|(_, v)| v.to_string()))
    }

    /// Raw `Set-Cookie` header for `name`.
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&prefix))
            .map(str::to_string)
    }

    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

fn user(tenant_id: Uuid, role: Role, email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        tenant_id,
        name: format!("{role} user"),
        email: email.into(),
        phone_e164: None,
        // Cost 4 keeps the suite fast; verification reads the cost from the hash.
        password_hash: bcrypt::hash(PASSWORD, 4).unwrap(),
        role,
        is_active: true,
        refresh_token_version: 0,
    }
}

pub fn reservation(tenant_id: Uuid, start_at: DateTime<Utc>, contact: &str) -> Reservation {
    Reservation {
        id: Uuid::new_v4(),
        tenant_id,
        status: ReservationStatus::Pending,
        experience_type: Some("dinner".into()),
        start_at,
        duration_minutes: 90,
        pax: 2,
        notes: None,
        assigned_table_ids: vec![],
        contact: Some(ContactSummary {
            id: Uuid::new_v4(),
            full_name: contact.into(),
            phone_e164: Some("+393331234567".into()),
        }),
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(config(Environment::Test))
    }

    pub fn with_config(config: ApiConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let tenant_id = Uuid::new_v4();
        let other_tenant_id = Uuid::new_v4();

        let admin = user(tenant_id, Role::Admin, "admin@pescheto.local");
        let manager = user(tenant_id, Role::Manager, "manager@pescheto.local");
        let staff = user(tenant_id, Role::Staff, "staff@pescheto.local");
        let accounting = user(tenant_id, Role::Accounting, "accounting@pescheto.local");
        let outsider = user(other_tenant_id, Role::Admin, "admin@elsewhere.local");
        for u in [&admin, &manager, &staff, &accounting, &outsider] {
            store.insert_user(u.clone());
        }

        let start = Utc::now() + Duration::days(1);
        let ours = reservation(tenant_id, start, "Maria Rossi");
        let theirs = reservation(other_tenant_id, start, "Luca Bianchi");
        store.insert_reservation(ours.clone());
        store.insert_reservation(theirs.clone());

        let state = AppState::with_store(config, store.clone()).unwrap();
        Self {
            router: backoffice_api::router(state),
            store,
            tenant_id,
            other_tenant_id,
            admin,
            manager,
            staff,
            accounting,
            outsider,
            reservation: ours,
            other_reservation: theirs,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let resp = self.router.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn login_raw(&self, email: &str, password: &str) -> TestResponse {
        self.send(
            Request::post("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "email": email, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
    }

    pub async fn login(&self, user: &User) -> Session {
        let resp = self.login_raw(&user.email, PASSWORD).await;
        assert_eq!(resp.status, StatusCode::OK, "login failed: {}", resp.body);
        session_from(&resp)
    }

    pub async fn refresh(&self, refresh: &str) -> TestResponse {
        self.send(
            Request::post("/auth/refresh")
                .header(header::COOKIE, format!("bo_refresh={refresh}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Authenticated request; `csrf` is sent as `x-csrf-token` when given.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        session: &Session,
        csrf: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("bo_access={}", session.access));
        if let Some(token) = csrf {
            builder = builder.header("x-csrf-token", token);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn patch_reservation(
        &self,
        session: &Session,
        id: impl std::fmt::Display,
        body: Value,
    ) -> TestResponse {
        self.call(
            Method::PATCH,
            &format!("/reservations/{id}"),
            session,
            Some(&session.csrf),
            Some(body),
        )
        .await
    }
}

pub fn session_from(resp: &TestResponse) -> Session {
    Session {
        access: resp.cookie("bo_access").expect("access cookie"),
        refresh: resp.cookie("bo_refresh").expect("refresh cookie"),
        csrf: resp.body["csrfToken"]
            .as_str()
            .expect("csrfToken in body")
            .to_string(),
    }
}
