use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use letgo_api::{app, middleware::RateLimiter, AppState};
use letgo_auth::{LogNotifier, OtpPolicy, TokenIssuer};
use letgo_core::memory::MemoryStore;
use letgo_core::repository::IdentityRepository;
use letgo_core::{Clock, ManualClock, NewIdentity, RepoError};

struct Harness {
    app: Router,
    store: MemoryStore,
    clock: ManualClock,
}

fn harness() -> Harness {
    harness_with(|state| state)
}

fn harness_with(configure: impl FnOnce(AppState) -> AppState) -> Harness {
    let store = MemoryStore::new();
    // Starts at wall-clock time so issued tokens pass `exp` validation
    let clock = ManualClock::default();
    let state = AppState::new(
        store.repositories(),
        Arc::new(LogNotifier),
        Arc::new(clock.clone()),
        OtpPolicy::default(),
        TokenIssuer::new("test-secret", 3600),
    );
    Harness { app: app(configure(state)), store, clock }
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

async fn register(app: &Router, phone: &str, role: &str) -> Value {
    let (status, body) = call(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Thandi", "lastName": "Mokoena", "phoneNumber": phone, "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["user"].clone()
}

async fn login(app: &Router, phone: &str) -> String {
    let (status, body) =
        call(app, "POST", "/api/auth/login", None, Some(json!({ "phoneNumber": phone }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let otp = body["devOtp"].as_str().unwrap().to_string();

    let (status, body) = call(
        app,
        "POST",
        "/api/auth/verifyOtp",
        None,
        Some(json!({ "phoneNumber": phone, "otp": otp })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

async fn seed_admin(h: &Harness, phone: &str) -> String {
    let admin = NewIdentity::administrator("Ops", "Admin", phone)
        .unwrap()
        .into_identity(h.clock.now());
    h.store.create_identity(&admin).await.unwrap();
    login(&h.app, phone).await
}

async fn create_trip(app: &Router, admin_token: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/trips",
        Some(admin_token),
        Some(json!({ "title": "Kruger weekend", "date": "2030-03-14", "totalSeats": 40 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["trip"]["id"].as_str().unwrap().to_string()
}

async fn create_assignment(app: &Router, driver_token: &str, trip_id: &str, seats: i32) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/driver-assignments",
        Some(driver_token),
        Some(json!({ "tripId": trip_id, "area": "Sandton", "availableSeats": seats })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["assignment"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_login_and_verify() {
    let h = harness();
    let user = register(&h.app, "+27821234567", "member").await;
    assert_eq!(user["role"], "member");
    assert!(user.get("codeDigest").is_none());

    let (status, body) = call(
        &h.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "phoneNumber": "+27821234567" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OTP sent successfully.");
    assert_eq!(body["userId"], user["id"]);
    let otp = body["devOtp"].as_str().unwrap().to_string();
    assert_eq!(otp.len(), 6);

    let wrong = if otp == "000000" { "111111" } else { "000000" };
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/auth/verifyOtp",
        None,
        Some(json!({ "phoneNumber": "+27821234567", "otp": wrong })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid OTP.");

    let (status, body) = call(
        &h.app,
        "POST",
        "/api/auth/verifyOtp",
        None,
        Some(json!({ "phoneNumber": "+27821234567", "otp": otp })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OTP verified. Login successful.");
    assert_eq!(body["user"]["phoneNumber"], "+27821234567");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    // The challenge is single-use
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/auth/verifyOtp",
        None,
        Some(json!({ "phoneNumber": "+27821234567", "otp": otp })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request. Please login again.");
}

#[tokio::test]
async fn test_registration_rejects_duplicates_and_admin_role() {
    let h = harness();
    register(&h.app, "+27821234567", "member").await;

    let (status, body) = call(
        &h.app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Sipho", "lastName": "Dube", "phoneNumber": "+27821234567" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User with this phone number already exists.");

    let (status, _) = call(
        &h.app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Sipho", "lastName": "Dube", "phoneNumber": "+27829999999", "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &h.app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Sipho", "lastName": "Dube", "phoneNumber": "0821234567" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_driver_registration_keeps_vehicle() {
    let h = harness();
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Lebo",
            "lastName": "Nkosi",
            "phoneNumber": "+27825550000",
            "role": "driver",
            "carModel": "Corolla",
            "carPlate": "CA 123-456"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "driver");
    assert_eq!(body["user"]["carModel"], "Corolla");
    assert_eq!(body["user"]["carPlate"], "CA 123-456");
}

#[tokio::test]
async fn test_login_unknown_phone_is_not_found() {
    let h = harness();
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "phoneNumber": "+27820000001" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User with this phone number does not exist.");

    let (status, _) = call(&h.app, "POST", "/api/auth/login", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resend_cooldown_returns_retry_after() {
    let h = harness();
    register(&h.app, "+27821234567", "member").await;
    let login_body = json!({ "phoneNumber": "+27821234567" });

    let (status, _) = call(&h.app, "POST", "/api/auth/login", None, Some(login_body.clone())).await;
    assert_eq!(status, StatusCode::OK);

    h.clock.advance(Duration::seconds(10));
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(login_body.to_string()))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "50");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Please wait 50s before requesting another code.");

    h.clock.advance(Duration::seconds(51));
    let (status, body) = call(&h.app, "POST", "/api/auth/login", None, Some(login_body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["devOtp"].is_string());
}

#[tokio::test]
async fn test_too_many_attempts() {
    let h = harness();
    register(&h.app, "+27821234567", "member").await;
    let (_, body) = call(
        &h.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "phoneNumber": "+27821234567" })),
    )
    .await;
    let otp = body["devOtp"].as_str().unwrap().to_string();
    let wrong = if otp == "000000" { "111111" } else { "000000" };

    for _ in 0..5 {
        let (status, _) = call(
            &h.app,
            "POST",
            "/api/auth/verifyOtp",
            None,
            Some(json!({ "phoneNumber": "+27821234567", "otp": wrong })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // Even the right code is refused once the cap is hit
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/auth/verifyOtp",
        None,
        Some(json!({ "phoneNumber": "+27821234567", "otp": otp })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many attempts. Please request a new OTP.");
}

#[tokio::test]
async fn test_expired_code_is_rejected() {
    let h = harness();
    register(&h.app, "+27821234567", "member").await;
    let (_, body) = call(
        &h.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "phoneNumber": "+27821234567" })),
    )
    .await;
    let otp = body["devOtp"].as_str().unwrap().to_string();

    h.clock.advance(Duration::seconds(301));
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/auth/verifyOtp",
        None,
        Some(json!({ "phoneNumber": "+27821234567", "otp": otp })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "OTP expired. Please request a new OTP.");
}

#[tokio::test]
async fn test_protected_routes_require_a_valid_token() {
    let h = harness();

    let (status, _) = call(&h.app, "GET", "/api/trips", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&h.app, "GET", "/api/trips", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let other_issuer = TokenIssuer::new("someone-else", 3600);
    let stranger = NewIdentity::administrator("Eve", "Intruder", "+27821110000")
        .unwrap()
        .into_identity(h.clock.now());
    let forged = other_issuer.issue(&stranger, h.clock.now()).unwrap();
    let (status, _) = call(&h.app, "POST", "/api/trips", Some(&forged), Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_trip_management_is_admin_only() {
    let h = harness();
    let admin = seed_admin(&h, "+27820000000").await;
    register(&h.app, "+27821234567", "member").await;
    let member = login(&h.app, "+27821234567").await;

    let (status, _) = call(
        &h.app,
        "POST",
        "/api/trips",
        Some(&member),
        Some(json!({ "title": "Kruger weekend", "date": "2030-03-14", "totalSeats": 40 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let later = create_trip(&h.app, &admin).await;
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/trips",
        Some(&admin),
        Some(json!({ "title": "Drakensberg hike", "date": "2030-01-02T06:00:00Z", "totalSeats": 12 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["trip"]["status"], "open");
    assert_eq!(body["trip"]["bookedSeats"], 0);

    let (status, body) = call(&h.app, "GET", "/api/trips", Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body.as_array().unwrap().iter().map(|t| t["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["Drakensberg hike", "Kruger weekend"]);

    let (status, _) = call(&h.app, "PATCH", &format!("/api/trips/{later}/close"), Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&h.app, "PATCH", &format!("/api/trips/{later}/close"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trip"]["status"], "closed");

    let (status, _) = call(
        &h.app,
        "PATCH",
        &format!("/api/trips/{}/close", Uuid::new_v4()),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_assignments_require_driver_and_open_trip() {
    let h = harness();
    let admin = seed_admin(&h, "+27820000000").await;
    register(&h.app, "+27825550000", "driver").await;
    let driver = login(&h.app, "+27825550000").await;
    let trip_id = create_trip(&h.app, &admin).await;

    let (status, _) = call(
        &h.app,
        "POST",
        "/api/driver-assignments",
        Some(&admin),
        Some(json!({ "tripId": trip_id, "area": "Sandton", "availableSeats": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    create_assignment(&h.app, &driver, &trip_id, 3).await;

    let (status, body) = call(
        &h.app,
        "GET",
        &format!("/api/driver-assignments/{trip_id}?area=Sandton"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let listings = body.as_array().unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["availableSeats"], 3);
    assert_eq!(listings[0]["driverName"], "Thandi");

    let (status, body) = call(
        &h.app,
        "GET",
        &format!("/api/driver-assignments/{trip_id}?area=Soweto"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = call(
        &h.app,
        "GET",
        &format!("/api/driver-assignments/{trip_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    call(&h.app, "PATCH", &format!("/api/trips/{trip_id}/close"), Some(&admin), None).await;
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/driver-assignments",
        Some(&driver),
        Some(json!({ "tripId": trip_id, "area": "Sandton", "availableSeats": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Trip not available");
}

#[tokio::test]
async fn test_booking_lifecycle() {
    let h = harness();
    let admin = seed_admin(&h, "+27820000000").await;
    register(&h.app, "+27825550000", "driver").await;
    let driver = login(&h.app, "+27825550000").await;
    register(&h.app, "+27821111111", "member").await;
    let rider_a = login(&h.app, "+27821111111").await;
    register(&h.app, "+27822222222", "member").await;
    let rider_b = login(&h.app, "+27822222222").await;

    let trip_id = create_trip(&h.app, &admin).await;
    let assignment_id = create_assignment(&h.app, &driver, &trip_id, 1).await;
    let seat = json!({ "tripId": trip_id, "driverAssignmentId": assignment_id });

    let (status, body) = call(&h.app, "POST", "/api/bookings", Some(&rider_a), Some(seat.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Seat booked");
    assert_eq!(body["booking"]["status"], "confirmed");
    let booking_a = body["booking"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(&h.app, "POST", "/api/bookings", Some(&rider_a), Some(seat.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Already booked");

    let (status, _) = call(&h.app, "POST", "/api/bookings", Some(&rider_b), Some(seat.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A sold-out car disappears from the listing
    let (_, body) = call(
        &h.app,
        "GET",
        &format!("/api/driver-assignments/{trip_id}?area=Sandton"),
        Some(&rider_b),
        None,
    )
    .await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = call(&h.app, "DELETE", &format!("/api/bookings/{booking_a}"), Some(&rider_b), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let (status, body) = call(&h.app, "DELETE", &format!("/api/bookings/{booking_a}"), Some(&rider_a), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Booking cancelled");
    assert_eq!(body["booking"]["status"], "cancelled");

    let (status, body) = call(&h.app, "DELETE", &format!("/api/bookings/{booking_a}"), Some(&rider_a), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Booking already cancelled");

    let (status, _) = call(&h.app, "POST", "/api/bookings", Some(&rider_b), Some(seat)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &h.app,
        "DELETE",
        &format!("/api/bookings/{}", Uuid::new_v4()),
        Some(&rider_a),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_rejects_assignment_from_another_trip() {
    let h = harness();
    let admin = seed_admin(&h, "+27820000000").await;
    register(&h.app, "+27825550000", "driver").await;
    let driver = login(&h.app, "+27825550000").await;
    register(&h.app, "+27821111111", "member").await;
    let rider = login(&h.app, "+27821111111").await;

    let trip_one = create_trip(&h.app, &admin).await;
    let trip_two = create_trip(&h.app, &admin).await;
    let assignment = create_assignment(&h.app, &driver, &trip_one, 2).await;

    let (status, body) = call(
        &h.app,
        "POST",
        "/api/bookings",
        Some(&rider),
        Some(json!({ "tripId": trip_two, "driverAssignmentId": assignment })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Driver not available");

    let (status, _) = call(&h.app, "POST", "/api/bookings", Some(&rider), Some(json!({ "tripId": trip_one }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

struct CountingLimiter {
    budget: usize,
    hits: AtomicUsize,
}

#[async_trait]
impl RateLimiter for CountingLimiter {
    async fn allow(&self, _key: &str) -> Result<bool, RepoError> {
        Ok(self.hits.fetch_add(1, Ordering::SeqCst) < self.budget)
    }
}

struct UnreachableLimiter;

#[async_trait]
impl RateLimiter for UnreachableLimiter {
    async fn allow(&self, _key: &str) -> Result<bool, RepoError> {
        Err("connection refused".into())
    }
}

fn from_peer(uri: &str) -> Request<Body> {
    let mut request = Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([203, 0, 113, 7], 40000))));
    request
}

#[tokio::test]
async fn test_ip_rate_limit() {
    let limiter = Arc::new(CountingLimiter { budget: 2, hits: AtomicUsize::new(0) });
    let h = harness_with(|state| state.with_rate_limiter(limiter));

    for _ in 0..2 {
        let response = h.app.clone().oneshot(from_peer("/api/trips")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = h.app.clone().oneshot(from_peer("/api/trips")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_ip_rate_limit_fails_open() {
    let h = harness_with(|state| state.with_rate_limiter(Arc::new(UnreachableLimiter)));
    let response = h.app.clone().oneshot(from_peer("/api/trips")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_ids_answer_with_json_errors() {
    let h = harness();
    let admin = seed_admin(&h, "+27820000000").await;
    register(&h.app, "+27821111111", "member").await;
    let rider = login(&h.app, "+27821111111").await;

    let (status, body) = call(
        &h.app,
        "POST",
        "/api/bookings",
        Some(&rider),
        Some(json!({ "tripId": "not-a-uuid", "driverAssignmentId": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or missing field: tripId");

    let (status, body) = call(&h.app, "DELETE", "/api/bookings/not-a-uuid", Some(&rider), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) =
        call(&h.app, "GET", "/api/driver-assignments/not-a-uuid?area=Sandton", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = call(&h.app, "PATCH", "/api/trips/42/close", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // Wrong field types in an otherwise valid body
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/trips",
        Some(&admin),
        Some(json!({ "title": "Conference", "date": "2026-11-14", "totalSeats": "forty" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
