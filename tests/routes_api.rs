#![cfg(feature = "inmem-store")]

use actix_web::{test, App};
use cib::repo::inmem::InMemRepo;
use cib::routes::{config, AppState};
use cib::security::SecurityHeaders;
use cib::storage::FsBlobStore;
use serial_test::serial;
use std::sync::Arc;

const PASSWORD: &str = "staff-secret-for-tests";

/// Staff password plus an isolated data dir per test.
fn setup_env() {
    std::env::set_var("STAFF_PASSWORD", PASSWORD);
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("CIB_DATA_DIR", tmp.path().to_str().unwrap());
    std::mem::forget(tmp);
}

macro_rules! test_app {
    () => {
        test::init_service(
            App::new()
                .wrap(SecurityHeaders)
                .app_data(actix_web::web::Data::new(AppState {
                    repo: Arc::new(InMemRepo::new()),
                    blob_store: Arc::new(FsBlobStore::new()),
                }))
                .configure(config),
        )
        .await
    };
}

// Multipart helpers for the submit endpoint.
fn push_text(body: &mut Vec<u8>, boundary: &str, name: &str, value: &str) {
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
            .as_bytes(),
    );
}

fn close_multipart(body: &mut Vec<u8>, boundary: &str) {
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
}

fn submit_body(fields: &[(&str, &str)]) -> (String, Vec<u8>) {
    let boundary = "CIBTESTBOUNDARY";
    let mut body = Vec::new();
    for (name, value) in fields {
        push_text(&mut body, boundary, name, value);
    }
    close_multipart(&mut body, boundary);
    (format!("multipart/form-data; boundary={boundary}"), body)
}

#[actix_web::test]
#[serial]
async fn login_accepts_correct_password_only() {
    setup_env();
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(serde_json::json!({"password": PASSWORD}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(body["message"], "Login successful");
    // no session artifact of any kind is issued
    assert!(body.get("token").is_none());

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(serde_json::json!({"password": "wrong"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    assert!(resp.headers().get("set-cookie").is_none());
}

#[actix_web::test]
#[serial]
async fn listing_requires_the_staff_header() {
    setup_env();
    let app = test_app!();

    // no header
    let req = test::TestRequest::get().uri("/api/complaints").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    // wrong header
    let req = test::TestRequest::get()
        .uri("/api/complaints")
        .insert_header(("x-staff-password", "nope"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    // correct header
    let req = test::TestRequest::get()
        .uri("/api/complaints")
        .insert_header(("x-staff-password", PASSWORD))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let list: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 0);
}

#[actix_web::test]
#[serial]
async fn submit_list_resolve_flow() {
    setup_env();
    let app = test_app!();

    // public submission, no photo
    let (ct, body) = submit_body(&[
        ("state", "PA"),
        ("productId", "PROD-9"),
        ("complaintDetails", "Wrong label on the jar"),
        ("customerName", "Grace"),
        ("complaintType", "Packaging"),
        ("submitterRole", "Customer"),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/complaints")
        .insert_header(("Content-Type", ct))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let created: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(created["status"], "Open");
    assert_eq!(created["state"], "PA");
    assert!(created["createdAt"].is_string());
    assert!(created["photoId"].is_null());
    let id = created["id"].as_str().unwrap().to_string();

    // a second submission lands on top of the listing
    let (ct, body) = submit_body(&[
        ("state", "WV"),
        ("productId", "PROD-10"),
        ("complaintDetails", "Stale on arrival"),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/complaints")
        .insert_header(("Content-Type", ct))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::get()
        .uri("/api/complaints")
        .insert_header(("x-staff-password", PASSWORD))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let list: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["productId"], "PROD-10"); // newest first
    assert_eq!(list[1]["productId"], "PROD-9");

    // resolve the first complaint
    let req = test::TestRequest::put()
        .uri(&format!("/api/complaints/{id}"))
        .insert_header(("x-staff-password", PASSWORD))
        .set_json(serde_json::json!({"status": "Resolved"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let updated: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(updated["status"], "Resolved");

    // the change is visible in a subsequent listing
    let req = test::TestRequest::get()
        .uri("/api/complaints")
        .insert_header(("x-staff-password", PASSWORD))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let list: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let resolved = list
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == id.as_str())
        .unwrap();
    assert_eq!(resolved["status"], "Resolved");
}

#[actix_web::test]
#[serial]
async fn submit_rejects_missing_required_fields() {
    setup_env();
    let app = test_app!();

    for fields in [
        vec![("productId", "P"), ("complaintDetails", "d")], // no state
        vec![("state", "MI"), ("complaintDetails", "d")],    // no productId
        vec![("state", "MI"), ("productId", "P")],           // no details
        vec![("state", "MI"), ("productId", ""), ("complaintDetails", "d")], // empty
    ] {
        let (ct, body) = submit_body(&fields);
        let req = test::TestRequest::post()
            .uri("/api/complaints")
            .insert_header(("Content-Type", ct))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let err: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
        assert_eq!(
            err["message"],
            "State, product ID, and complaint details are required"
        );
    }

    // nothing persisted
    let req = test::TestRequest::get()
        .uri("/api/complaints")
        .insert_header(("x-staff-password", PASSWORD))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let list: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 0);
}

#[actix_web::test]
#[serial]
async fn submit_rejects_out_of_set_enum_values() {
    setup_env();
    let app = test_app!();

    let (ct, body) = submit_body(&[
        ("state", "CA"), // not an allowed state
        ("productId", "PROD-9"),
        ("complaintDetails", "details"),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/complaints")
        .insert_header(("Content-Type", ct))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let (ct, body) = submit_body(&[
        ("state", "MI"),
        ("productId", "PROD-9"),
        ("complaintDetails", "details"),
        ("complaintType", "Taste"), // not an allowed type
    ]);
    let req = test::TestRequest::post()
        .uri("/api/complaints")
        .insert_header(("Content-Type", ct))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
#[serial]
async fn update_status_unknown_id_and_auth() {
    setup_env();
    let app = test_app!();

    let missing = uuid::Uuid::new_v4();

    // unauthenticated update is rejected before the repo is consulted
    let req = test::TestRequest::put()
        .uri(&format!("/api/complaints/{missing}"))
        .set_json(serde_json::json!({"status": "Resolved"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::put()
        .uri(&format!("/api/complaints/{missing}"))
        .insert_header(("x-staff-password", PASSWORD))
        .set_json(serde_json::json!({"status": "Resolved"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    // out-of-set status value never reaches the repository
    let req = test::TestRequest::put()
        .uri(&format!("/api/complaints/{missing}"))
        .insert_header(("x-staff-password", PASSWORD))
        .set_json(serde_json::json!({"status": "Closed"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}
