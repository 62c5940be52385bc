//! End-to-end checks through the axum router with a redb store in a temp
//! work directory.

use axum::Router;
use axum::body::Body;
use club_server::auth::JwtConfig;
use club_server::{Config, ServerState, api};
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const CRON_SECRET: &str = "cron-test-secret";

struct TestApp {
    app: Router,
    _dir: TempDir,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_overrides(dir.path().to_string_lossy(), 0);
    config.jwt = JwtConfig {
        secret: "integration-test-secret-with-enough-bytes".to_string(),
        expiration_minutes: 60,
        issuer: "club-server".to_string(),
        audience: "club-backoffice".to_string(),
    };
    config.cron_secret = Some(CRON_SECRET.to_string());
    config.admin_username = "admin".to_string();
    config.admin_password = "admin-pass".to_string();

    let state = ServerState::initialize(&config).unwrap();
    TestApp {
        app: api::build_app(state),
        _dir: dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, http::HeaderMap, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, _, body) = self.send(request).await;
        (status, body)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();
    let (status, body) = app.call("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_login_sets_cookie_and_cookie_authenticates() {
    let app = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "username": "ADMIN", "password": "admin-pass" }).to_string(),
        ))
        .unwrap();
    let (status, headers, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "ADMIN");
    let cookie = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("club_token="));
    assert!(cookie.contains("HttpOnly"));

    let token = body["token"].as_str().unwrap();
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::COOKIE, format!("club_token={token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, me) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "admin");
    assert_eq!(me["permissions"], json!(["all"]));
}

#[tokio::test]
async fn test_bad_credentials_and_missing_session() {
    let app = test_app();

    let (status, body) = app
        .call(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1002);

    let (status, _) = app.call("GET", "/api/members", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_charge_run_and_payment_update_member_status() {
    let app = test_app();
    let token = app.login("admin", "admin-pass").await;
    let token = Some(token.as_str());

    let (status, category) = app
        .call(
            "POST",
            "/api/categories",
            token,
            Some(json!({ "name": "Activo", "monthlyFee": 150000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{category}");

    let (status, member) = app
        .call(
            "POST",
            "/api/members",
            token,
            Some(json!({
                "firstName": "Ana",
                "lastName": "Benítez",
                "document": "4567890",
                "categoryId": category["id"],
                "joinedOn": "2024-12-01"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{member}");
    assert_eq!(member["code"], "S-00001");
    let member_id = member["id"].as_u64().unwrap();

    let (status, run) = app
        .call(
            "POST",
            "/api/charges/generate",
            token,
            Some(json!({ "period": "2025-01" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["created"], 1);

    // Second run for the same period creates nothing
    let (_, run) = app
        .call(
            "POST",
            "/api/charges/generate",
            token,
            Some(json!({ "period": "2025-01" })),
        )
        .await;
    assert_eq!(run["created"], 0);
    assert_eq!(run["skipped"], 1);

    let (_, overdue) = app
        .call("GET", "/api/members?status=ATRASADO", token, None)
        .await;
    assert_eq!(overdue.as_array().unwrap().len(), 1);

    let (status, payment) = app
        .call(
            "POST",
            "/api/payments",
            token,
            Some(json!({ "memberId": member_id, "amount": 150000, "method": "EFECTIVO" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{payment}");
    assert_eq!(payment["receiptNumber"], "REC-000001");
    assert_eq!(payment["allocations"][0]["amount"], 150000);

    let (_, view) = app
        .call("GET", &format!("/api/members/{member_id}"), token, None)
        .await;
    assert_eq!(view["status"], "AL_DIA");

    let (_, balance) = app
        .call("GET", &format!("/api/members/{member_id}/balance"), token, None)
        .await;
    assert_eq!(balance["outstanding"], 0);

    // The category is referenced by the member
    let (status, body) = app
        .call(
            "DELETE",
            &format!("/api/categories/{}", category["id"]),
            token,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn test_over_allocated_payment_is_rejected() {
    let app = test_app();
    let token = app.login("admin", "admin-pass").await;
    let token = Some(token.as_str());

    let (_, member) = app
        .call(
            "POST",
            "/api/members",
            token,
            Some(json!({ "firstName": "Luis", "lastName": "Ayala", "document": "123" })),
        )
        .await;
    let member_id = member["id"].as_u64().unwrap();
    let (status, debit) = app
        .call(
            "POST",
            &format!("/api/members/{member_id}/movements"),
            token,
            Some(json!({ "tipo": "DEBIT", "amount": 50000, "concept": "Multa" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{debit}");

    let (status, body) = app
        .call(
            "POST",
            "/api/payments",
            token,
            Some(json!({
                "memberId": member_id,
                "amount": 80000,
                "method": "TRANSFERENCIA",
                "allocations": [{ "debitId": debit["id"], "amount": 80000 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = app
        .call(
            "POST",
            "/api/payments",
            token,
            Some(json!({
                "memberId": member_id,
                "amount": 100,
                "method": "EFECTIVO",
                "allocations": [
                    { "debitId": debit["id"], "amount": i64::MAX },
                    { "debitId": debit["id"], "amount": 2 }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["code"], 2);

    // Nothing was written
    let (_, payments) = app.call("GET", "/api/payments", token, None).await;
    assert!(payments.as_array().unwrap().is_empty());
    let (_, movements) = app
        .call("GET", &format!("/api/members/{member_id}/movements"), token, None)
        .await;
    assert_eq!(movements.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_refinancing_simulation() {
    let app = test_app();
    let token = app.login("admin", "admin-pass").await;

    let (status, schedule) = app
        .call(
            "POST",
            "/api/refinancings/simulate",
            Some(&token),
            Some(json!({
                "principal": 1000000,
                "downPaymentPercent": 20,
                "installmentCount": 3,
                "firstDueDate": "2099-01-31"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{schedule}");
    assert_eq!(schedule["downPayment"], 200000);
    let amounts: Vec<i64> = schedule["installments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["amount"].as_i64().unwrap())
        .collect();
    assert_eq!(amounts, vec![267000, 267000, 266000]);
    assert_eq!(schedule["installments"][1]["dueDate"], "2099-02-28");

    let (status, body) = app
        .call(
            "POST",
            "/api/refinancings/simulate",
            Some(&token),
            Some(json!({
                "principal": 0,
                "downPaymentPercent": 90,
                "installmentCount": 13,
                "firstDueDate": "2000-01-01"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["errors"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_cobrador_cannot_manage_members() {
    let app = test_app();
    let admin = app.login("admin", "admin-pass").await;

    let (status, body) = app
        .call(
            "POST",
            "/api/users",
            Some(&admin),
            Some(json!({
                "username": "cobrador1",
                "displayName": "Cobrador Uno",
                "password": "cobra-pass",
                "role": "COBRADOR"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let cobrador = app.login("cobrador1", "cobra-pass").await;
    let (status, _) = app
        .call(
            "POST",
            "/api/members",
            Some(&cobrador),
            Some(json!({ "firstName": "X", "lastName": "Y", "document": "1" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Reads only need a session
    let (status, _) = app.call("GET", "/api/members", Some(&cobrador), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call("GET", "/api/maintenance/integrity", Some(&cobrador), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2003);

    let (status, report) = app
        .call("GET", "/api/maintenance/integrity", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["healthy"], true);
}

#[tokio::test]
async fn test_cron_requires_secret() {
    let app = test_app();

    let (status, _) = app
        .call("POST", "/api/cron/reservations/expire", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call("POST", "/api/cron/reservations/expire", Some("wrong"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call("GET", "/api/cron/reservations/expire", Some(CRON_SECRET), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 0);
}
