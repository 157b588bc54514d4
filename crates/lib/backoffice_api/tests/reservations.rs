//! Reservation listing and patching through the full router.

mod common;

use std::time::Duration as StdDuration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::{Json, Router, routing::post};
use backoffice_api::config::{CalendarConfig, Environment};
use backoffice_core::models::reservation::ReservationStatus;
use chrono::{Duration, Utc};
use common::{TestApp, config, reservation};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use url::Url;

#[tokio::test]
async fn list_is_tenant_scoped_and_ordered() {
    let app = TestApp::new();
    let later = reservation(app.tenant_id, Utc::now() + Duration::days(3), "Giulia Verdi");
    let sooner = reservation(app.tenant_id, Utc::now() + Duration::hours(2), "Paolo Neri");
    app.store.insert_reservation(later.clone());
    app.store.insert_reservation(sooner.clone());

    let session = app.login(&app.accounting).await;
    let resp = app
        .call(Method::GET, "/reservations", &session, None, None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let ids: Vec<&str> = resp.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    let expected = [
        sooner.id.to_string(),
        app.reservation.id.to_string(),
        later.id.to_string(),
    ];
    assert_eq!(ids, expected);
    assert!(!ids.contains(&app.other_reservation.id.to_string().as_str()));

    let first = &resp.body["data"][0];
    assert_eq!(first["contact"]["fullName"], "Paolo Neri");
    assert!(first.get("startAt").is_some());
}

#[tokio::test]
async fn list_filters_by_query_status_and_window() {
    let app = TestApp::new();
    let mut confirmed = reservation(app.tenant_id, Utc::now() + Duration::days(10), "Anna Gallo");
    confirmed.status = ReservationStatus::Confirmed;
    app.store.insert_reservation(confirmed.clone());
    let session = app.login(&app.staff).await;

    let resp = app
        .call(Method::GET, "/reservations?q=GALLO", &session, None, None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"].as_array().unwrap().len(), 1);
    assert_eq!(resp.body["data"][0]["id"], confirmed.id.to_string());

    let resp = app
        .call(Method::GET, "/reservations?status=CONFIRMED", &session, None, None)
        .await;
    assert_eq!(resp.body["data"].as_array().unwrap().len(), 1);

    let from = (Utc::now() + Duration::days(5)).to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let resp = app
        .call(
            Method::GET,
            &format!("/reservations?from={from}"),
            &session,
            None,
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn list_rejects_malformed_filters() {
    let app = TestApp::new();
    let session = app.login(&app.admin).await;
    let resp = app
        .call(Method::GET, "/reservations?status=LOST", &session, None, None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error(), "VALIDATION_ERROR");

    let resp = app
        .call(Method::GET, "/reservations?from=yesterday", &session, None, None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_is_capped_at_two_hundred_rows() {
    let app = TestApp::new();
    for i in 0..205 {
        app.store.insert_reservation(reservation(
            app.tenant_id,
            Utc::now() + Duration::minutes(i),
            "Bulk Guest",
        ));
    }
    let session = app.login(&app.admin).await;
    let resp = app
        .call(Method::GET, "/reservations", &session, None, None)
        .await;
    assert_eq!(resp.body["data"].as_array().unwrap().len(), 200);
}

#[tokio::test]
async fn list_requires_authentication() {
    let app = TestApp::new();
    let resp = app
        .send(Request::get("/reservations").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn staff_may_patch_notes_and_pax() {
    let app = TestApp::new();
    let session = app.login(&app.staff).await;
    let resp = app
        .patch_reservation(
            &session,
            app.reservation.id,
            json!({ "notes": "birthday cake", "pax": 4 }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["pax"], 4);
    assert_eq!(resp.body["data"]["notes"], "birthday cake");

    let stored = app.store.reservation(app.reservation.id).unwrap();
    assert_eq!(stored.pax, 4);
    assert_eq!(stored.notes.as_deref(), Some("birthday cake"));
}

#[tokio::test]
async fn staff_patch_outside_allowed_fields_is_rejected_without_write() {
    let app = TestApp::new();
    let session = app.login(&app.staff).await;
    let resp = app
        .patch_reservation(
            &session,
            app.reservation.id,
            json!({ "pax": 5, "status": "CANCELLED" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(
        resp.body,
        json!({ "error": "FORBIDDEN_FIELD", "field": "status" })
    );

    let stored = app.store.reservation(app.reservation.id).unwrap();
    assert_eq!(stored, app.reservation);
    assert!(app.store.audit_entries().unwrap().is_empty());
}

#[tokio::test]
async fn manager_may_patch_every_field_and_null_clears() {
    let app = TestApp::new();
    let session = app.login(&app.manager).await;
    let start = "2026-12-24T20:00:00Z";
    let resp = app
        .patch_reservation(
            &session,
            app.reservation.id,
            json!({
                "startAt": start,
                "durationMinutes": 120,
                "status": "CONFIRMED",
                "assignedTableIds": ["t1", "t2"],
                "experienceType": null
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let stored = app.store.reservation(app.reservation.id).unwrap();
    assert_eq!(stored.status, ReservationStatus::Confirmed);
    assert_eq!(stored.duration_minutes, 120);
    assert_eq!(stored.start_at, start.parse::<chrono::DateTime<Utc>>().unwrap());
    assert_eq!(stored.assigned_table_ids, vec!["t1", "t2"]);
    assert_eq!(stored.experience_type, None);
    assert_eq!(stored.pax, app.reservation.pax);
}

#[tokio::test]
async fn patch_is_audited() {
    let app = TestApp::new();
    let session = app.login(&app.admin).await;
    let resp = app
        .patch_reservation(&session, app.reservation.id, json!({ "pax": 6 }))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let entries = app.store.audit_entries().unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.action, "reservation.updated");
    assert_eq!(entry.entity_type, "reservation");
    assert_eq!(entry.entity_id, app.reservation.id.to_string());
    assert_eq!(entry.tenant_id, app.tenant_id);
    assert_eq!(entry.actor_user_id, Some(app.admin.id));
    assert_eq!(entry.metadata, json!({ "changes": { "pax": 6 } }));
}

#[tokio::test]
async fn patch_requires_matching_csrf_header() {
    let app = TestApp::new();
    let session = app.login(&app.admin).await;
    let uri = format!("/reservations/{}", app.reservation.id);
    let body = Some(json!({ "pax": 3 }));

    let resp = app
        .call(Method::PATCH, &uri, &session, None, body.clone())
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error(), "CSRF_INVALID");

    let resp = app
        .call(Method::PATCH, &uri, &session, Some("not-the-nonce"), body.clone())
        .await;
    assert_eq!(resp.error(), "CSRF_INVALID");

    // A nonce from another session does not match this access token.
    let other = app.login(&app.manager).await;
    let resp = app
        .call(Method::PATCH, &uri, &session, Some(&other.csrf), body)
        .await;
    assert_eq!(resp.error(), "CSRF_INVALID");
    assert_eq!(app.store.reservation(app.reservation.id).unwrap().pax, 2);
}

#[tokio::test]
async fn accounting_cannot_patch() {
    let app = TestApp::new();
    let session = app.login(&app.accounting).await;
    let resp = app
        .patch_reservation(&session, app.reservation.id, json!({ "pax": 3 }))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error(), "FORBIDDEN");
}

#[tokio::test]
async fn cross_tenant_patch_is_not_found() {
    let app = TestApp::new();
    let session = app.login(&app.admin).await;
    let resp = app
        .patch_reservation(&session, app.other_reservation.id, json!({ "pax": 9 }))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body, json!({ "error": "NOT_FOUND" }));
    assert_eq!(app.store.reservation(app.other_reservation.id).unwrap().pax, 2);

    let resp = app
        .patch_reservation(&session, "not-a-uuid", json!({ "pax": 9 }))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_patch_values_are_validation_errors() {
    let app = TestApp::new();
    let session = app.login(&app.admin).await;
    let resp = app
        .patch_reservation(
            &session,
            app.reservation.id,
            json!({ "pax": 0, "durationMinutes": 5000 }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error(), "VALIDATION_ERROR");
    assert!(resp.body["details"]["pax"].is_array());
    assert!(resp.body["details"]["durationMinutes"].is_array());

    let resp = app
        .patch_reservation(&session, app.reservation.id, json!({ "pax": "four" }))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn validation_precedes_staff_field_check() {
    let app = TestApp::new();
    let session = app.login(&app.staff).await;
    let resp = app
        .patch_reservation(
            &session,
            app.reservation.id,
            json!({ "pax": 0, "status": "CANCELLED" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn successful_patch_triggers_calendar_sync() {
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let core = Router::new().route(
        "/internal/calendar/sync-reservation",
        post(move |Json(body): Json<Value>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(body);
                "ok"
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, core).await.unwrap();
    });

    let mut cfg = config(Environment::Test);
    cfg.calendar = CalendarConfig {
        base_url: Some(Url::parse(&format!("http://{addr}")).unwrap()),
        internal_token: "internal".into(),
    };
    let app = TestApp::with_config(cfg);
    let session = app.login(&app.manager).await;
    let resp = app
        .patch_reservation(&session, app.reservation.id, json!({ "pax": 3 }))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let body = tokio::time::timeout(StdDuration::from_secs(5), rx.recv())
        .await
        .expect("sync request within timeout")
        .expect("sync request body");
    assert_eq!(body, json!({ "reservation_id": app.reservation.id }));
}
