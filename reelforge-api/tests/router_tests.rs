/// Router tests for the Reelforge API
///
/// These drive the complete middleware stack through `tower::Service::call`
/// with the in-memory auth adapter; none of them reach the database.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode, Uri},
    routing::{any, get},
    Router,
};
use chrono::{Duration, Utc};
use common::{body_json, body_text, session_cookie, unique_email, CapturedLogs, TestApp, TEST_PASSWORD, TEST_SECRET};
use reelforge_api::{
    app::{apply_middleware, AppState},
    config::{Config, IntegrationsConfig, DEFAULT_BODY_LIMIT},
    middleware::request_id::REQUEST_ID_HEADER,
};
use reelforge_shared::auth::{middleware::SESSION_COOKIE_NAME, token::sign_token};
use serde_json::json;

#[tokio::test]
async fn test_oversized_post_is_rejected_before_the_handler() {
    let app = TestApp::in_memory();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/videos")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(vec![b'a'; DEFAULT_BODY_LIMIT + 1]))
        .unwrap();
    let response = app.call(request).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await, json!({ "error": "Body size limit exceeded" }));
}

#[tokio::test]
async fn test_declared_length_over_limit_is_rejected() {
    let mut config = Config::for_testing(TEST_SECRET);
    config.api.body_limit = 16;
    let app = TestApp::in_memory_with(config);

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/crm/contacts/anything")
        .header(header::CONTENT_LENGTH, "17")
        .body(Body::from("x".repeat(17)))
        .unwrap();
    let response = app.call(request).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_protected_routes_require_a_session() {
    let app = TestApp::in_memory();

    for (method, uri) in [
        (Method::GET, "/api/videos"),
        (Method::POST, "/api/videos"),
        (Method::GET, "/api/crm/contacts"),
        (Method::POST, "/api/crm/contacts"),
        (Method::GET, "/api/crm/contacts/6f1c0e1e-8a53-4a0e-9d5c-2f4a4b7c9e10"),
        (Method::PUT, "/api/crm/contacts/6f1c0e1e-8a53-4a0e-9d5c-2f4a4b7c9e10"),
        (Method::DELETE, "/api/crm/contacts/6f1c0e1e-8a53-4a0e-9d5c-2f4a4b7c9e10"),
        (Method::PATCH, "/api/account"),
        (Method::DELETE, "/api/account"),
    ] {
        let body = matches!(method, Method::POST | Method::PUT | Method::PATCH).then(|| json!({}));
        let response = app.send(method.clone(), uri, body, None).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body_json(response).await, json!({ "error": "Unauthorized" }));
    }
}

#[tokio::test]
async fn test_forged_cookie_is_anonymous() {
    let app = TestApp::in_memory();
    let (_, cookie) = app.sign_up().await;
    let forged = format!("{}00", cookie);

    let response = app.send(Method::GET, "/api/videos", None, Some(&forged)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_video_lists_missing_fields() {
    let app = TestApp::in_memory();
    let (_, cookie) = app.sign_up().await;

    let response = app
        .send(Method::POST, "/api/videos", Some(json!({ "description": "A sunrise" })), Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing required fields: prompt, title");
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_contact_requires_name_and_email() {
    let app = TestApp::in_memory();
    let (_, cookie) = app.sign_up().await;

    let response = app
        .send(Method::POST, "/api/crm/contacts", Some(json!({ "company": "Acme" })), Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Missing required fields: email, name");
}

#[tokio::test]
async fn test_contact_list_rejects_unknown_status() {
    let app = TestApp::in_memory();
    let (_, cookie) = app.sign_up().await;

    let response = app
        .send(Method::GET, "/api/crm/contacts?status=vip", None, Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_contact_update_is_rejected() {
    let app = TestApp::in_memory();
    let (_, cookie) = app.sign_up().await;

    let response = app
        .send(
            Method::PUT,
            "/api/crm/contacts/6f1c0e1e-8a53-4a0e-9d5c-2f4a4b7c9e10",
            Some(json!({})),
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "No fields to update" }));
}

#[tokio::test]
async fn test_blank_contact_name_is_invalid_not_missing() {
    let app = TestApp::in_memory();
    let (_, cookie) = app.sign_up().await;

    let response = app
        .send(
            Method::PUT,
            "/api/crm/contacts/6f1c0e1e-8a53-4a0e-9d5c-2f4a4b7c9e10",
            Some(json!({ "name": "" })),
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({
            "error": "Invalid fields: name",
            "details": [{ "field": "name", "message": "name cannot be empty" }]
        })
    );
}

#[tokio::test]
async fn test_malformed_contact_id_is_not_found() {
    let app = TestApp::in_memory();
    let (_, cookie) = app.sign_up().await;

    let response = app
        .send(Method::GET, "/api/crm/contacts/not-a-uuid", None, Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({ "error": "Contact not found" }));
}

#[tokio::test]
async fn test_contact_form_validates_without_a_session() {
    let app = TestApp::in_memory();

    let response = app
        .send(Method::POST, "/api/contact", Some(json!({ "name": "Ada" })), None)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Missing required fields: email, message, subject"
    );
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::in_memory();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.call(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_sign_in_failures_are_indistinguishable() {
    let app = TestApp::in_memory();
    let (email, _) = app.sign_up().await;

    let attempts = [
        json!({ "email": unique_email(), "password": TEST_PASSWORD }),
        json!({ "email": email, "password": "wrong password" }),
        json!({ "email": email }),
        json!({}),
    ];

    for attempt in attempts {
        let response = app.send(Method::POST, "/api/auth/signin", Some(attempt), None).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(body_json(response).await, json!({ "error": "Invalid email or password" }));
    }
}

#[tokio::test]
async fn test_sign_in_sets_cookie_and_returns_user() {
    let app = TestApp::in_memory();
    let (email, _) = app.sign_up().await;

    let response = app
        .send(
            Method::POST,
            "/api/auth/signin",
            Some(json!({ "email": email.to_uppercase(), "password": TEST_PASSWORD })),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with("reelforge.session-token="));
    assert!(set_cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], email.as_str());
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
async fn test_duplicate_sign_up_is_rejected() {
    let app = TestApp::in_memory();
    let (email, _) = app.sign_up().await;

    let response = app
        .send(
            Method::POST,
            "/api/auth/signup",
            Some(json!({ "email": email, "password": "another password" })),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Unable to create account with these credentials" })
    );
}

#[tokio::test]
async fn test_session_round_trip() {
    let app = TestApp::in_memory();

    let response = app.send(Method::GET, "/api/auth/session", None, None).await;
    assert_eq!(body_json(response).await, json!({ "session": null }));

    let (email, cookie) = app.sign_up().await;
    let response = app.send(Method::GET, "/api/auth/session", None, Some(&cookie)).await;
    let body = body_json(response).await;
    assert_eq!(body["session"]["user"]["email"], email.as_str());
    assert!(body["session"]["expires"].is_string());

    let response = app.send(Method::POST, "/api/auth/signout", None, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).unwrap().ends_with('='));

    let response = app.send(Method::GET, "/api/auth/session", None, Some(&cookie)).await;
    assert_eq!(body_json(response).await, json!({ "session": null }));
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let app = TestApp::in_memory();
    let (email, cookie) = app.sign_up().await;
    let (_, signed) = cookie.split_once('=').unwrap();

    let request = Request::builder()
        .uri("/api/auth/session")
        .header(header::AUTHORIZATION, format!("Bearer {}", signed))
        .body(Body::empty())
        .unwrap();
    let body = body_json(app.call(request).await).await;

    assert_eq!(body["session"]["user"]["email"], email.as_str());
}

#[tokio::test]
async fn test_extended_session_reissues_cookie() {
    let app = TestApp::in_memory();
    let (email, _) = app.sign_up().await;
    let user = app
        .state
        .auth
        .adapter()
        .get_user_by_email(&email)
        .await
        .unwrap()
        .unwrap()
        .user;

    // Last extended two days ago
    app.state
        .auth
        .adapter()
        .create_session("aging-session", user.id, Utc::now() + Duration::days(28))
        .await
        .unwrap();
    let signed = sign_token("aging-session", TEST_SECRET).unwrap();
    let cookie = format!("{}={}", SESSION_COOKIE_NAME, signed);

    let response = app.send(Method::GET, "/api/auth/session", None, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with(&cookie));
    assert!(set_cookie.contains(&format!("Max-Age={}", Duration::days(30).num_seconds())));
}

#[tokio::test]
async fn test_fresh_session_does_not_reissue_cookie() {
    let app = TestApp::in_memory();
    let (_, cookie) = app.sign_up().await;

    let response = app.send(Method::GET, "/api/auth/session", None, Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_profile_update_and_account_deletion() {
    let app = TestApp::in_memory();
    let (_, cookie) = app.sign_up().await;

    let response = app
        .send(Method::PATCH, "/api/account", Some(json!({ "name": "Ada L.", "image": null })), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user"]["name"], "Ada L.");

    let response = app.send(Method::PATCH, "/api/account", Some(json!({})), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(Method::DELETE, "/api/account", None, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(Method::GET, "/api/auth/session", None, Some(&cookie)).await;
    assert_eq!(body_json(response).await, json!({ "session": null }));
}

#[tokio::test]
async fn test_email_verification() {
    let app = TestApp::in_memory();
    let (email, cookie) = app.sign_up().await;

    let response = app
        .send(Method::POST, "/api/auth/verify-email/request", None, Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let token = app.state.auth.issue_verification_token(&email).await.unwrap();
    let request = json!({ "identifier": email, "token": token.token });

    let response = app.send(Method::POST, "/api/auth/verify-email", Some(request.clone()), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["user"]["email_verified"].is_string());

    let response = app.send(Method::POST, "/api/auth/verify-email", Some(request), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let app = TestApp::in_memory();

    let request = Request::builder()
        .uri("/api/auth/session")
        .header(REQUEST_ID_HEADER, "trace-abc_123")
        .body(Body::empty())
        .unwrap();
    let response = app.call(request).await;
    assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "trace-abc_123");

    let request = Request::builder()
        .uri("/api/auth/session")
        .header(REQUEST_ID_HEADER, "not valid!")
        .body(Body::empty())
        .unwrap();
    let response = app.call(request).await;
    let generated = response.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
}

#[tokio::test]
async fn test_logs_outside_handlers_carry_request_id_in_production() {
    let (logs, _guard) = CapturedLogs::install("reelforge_shared=debug,reelforge_api=debug");

    let mut config = Config::for_testing(TEST_SECRET);
    config.api.production = true;
    let app = TestApp::unreachable_database(config);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/signin")
        .header(header::CONTENT_TYPE, "application/json")
        .header(REQUEST_ID_HEADER, "signin-req-42")
        .body(Body::from(json!({ "email": "ada@example.com", "password": TEST_PASSWORD }).to_string()))
        .unwrap();
    let response = app.call(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let output = logs.contents();
    let line = output
        .lines()
        .find(|line| line.contains("Sign-in lookup failed"))
        .unwrap_or_else(|| panic!("no sign-in failure logged:\n{output}"));
    assert!(line.contains("request_id=signin-req-42"), "{line}");
}

#[tokio::test]
async fn test_verification_token_stays_out_of_debug_logs() {
    let (logs, _guard) = CapturedLogs::install("reelforge_api=debug");
    let app = TestApp::in_memory();
    let (_, cookie) = app.sign_up().await;

    let response = app
        .send(Method::POST, "/api/auth/verify-email/request", None, Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let output = logs.contents();
    assert!(output.contains("Verification token issued"), "{output}");
    assert!(!output.contains("token="), "{output}");
}

#[tokio::test]
async fn test_error_responses_carry_request_id_and_security_headers() {
    let app = TestApp::in_memory();

    let response = app.send(Method::GET, "/api/videos", None, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(REQUEST_ID_HEADER).is_some());
    assert_eq!(response.headers().get("x-content-type-options").unwrap(), "nosniff");
}

#[tokio::test]
async fn test_cors_preflight_for_configured_origin() {
    let mut config = Config::for_testing(TEST_SECRET);
    config.api.cors_origins = vec!["https://app.example.com".to_string()];
    let app = TestApp::in_memory_with(config);

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/crm/contacts")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .body(Body::empty())
        .unwrap();
    let response = app.call(request).await;

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://app.example.com"
    );
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_disabled_without_origins() {
    let app = TestApp::in_memory();

    let request = Request::builder()
        .uri("/api/auth/session")
        .header(header::ORIGIN, "https://app.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.call(request).await;

    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn test_integrations_not_mounted_without_upstream() {
    let app = TestApp::in_memory();

    let response = app.send(Method::GET, "/integrations/stripe/charges", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unreachable_integrations_upstream_is_bad_gateway() {
    let mut config = Config::for_testing(TEST_SECRET);
    config.integrations = Some(IntegrationsConfig {
        upstream_url: "http://127.0.0.1:9".to_string(),
        host: None,
    });
    let app = TestApp::in_memory_with(config);

    let response = app.send(Method::GET, "/integrations/stripe/charges?limit=1", None, None).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_json(response).await["error"].is_string());
}

/// Upstream that answers with the method, URI, and body it received
async fn spawn_echo_upstream() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let upstream = Router::new().route(
        "/integrations/*rest",
        any(|method: Method, uri: Uri, body: String| async move { format!("{} {} {}", method, uri, body) }),
    );
    tokio::spawn(async move { axum::serve(listener, upstream).await.unwrap() });

    format!("http://{}", addr)
}

fn proxied_app(upstream_url: String, body_limit: usize) -> TestApp {
    let mut config = Config::for_testing(TEST_SECRET);
    config.api.body_limit = body_limit;
    config.integrations = Some(IntegrationsConfig { upstream_url, host: None });
    TestApp::in_memory_with(config)
}

#[tokio::test]
async fn test_integrations_forward_method_query_and_body() {
    let app = proxied_app(spawn_echo_upstream().await, DEFAULT_BODY_LIMIT);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/integrations/crm/items?id=7")
        .body(Body::from("remove me"))
        .unwrap();
    let response = app.call(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "DELETE /integrations/crm/items?id=7 remove me");

    let response = app.send(Method::GET, "/integrations/status?verbose=1", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "GET /integrations/status?verbose=1 ");
}

#[tokio::test]
async fn test_integrations_body_over_limit_is_not_forwarded() {
    let app = proxied_app(spawn_echo_upstream().await, 16);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/integrations/search")
        .body(Body::from("x".repeat(32)))
        .unwrap();
    let response = app.call(request).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

async fn panicking_handler() -> &'static str {
    panic!("handler exploded")
}

fn panicking_app(state: AppState) -> Router {
    let router = Router::new().route("/boom", get(panicking_handler).post(panicking_handler));
    apply_middleware(router, state)
}

#[tokio::test]
async fn test_panic_on_get_renders_error_page() {
    let app = TestApp::in_memory();
    let mut router = panicking_app(app.state.clone());

    let response = tower::Service::call(
        &mut router,
        Request::builder().uri("/boom").body(Body::empty()).unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(REQUEST_ID_HEADER).is_some());
    assert!(body_text(response).await.contains("<html"));
}

#[tokio::test]
async fn test_panic_on_post_is_json_500() {
    let app = TestApp::in_memory();
    let mut router = panicking_app(app.state.clone());

    let response = tower::Service::call(
        &mut router,
        Request::builder().method(Method::POST).uri("/boom").body(Body::empty()).unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({ "error": "An error occurred in your app" }));
}
