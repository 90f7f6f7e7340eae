//! Integration tests for xsrf-gate

use chrono::{Duration, Utc};
use http::header::{COOKIE, SET_COOKIE};
use http::{Request, Response, StatusCode};
use xsrf_gate::middleware::protect;
use xsrf_gate::*;

fn test_options() -> CsrfOptions {
    CsrfOptions::new()
        .with_cookie_name("TEST-CSRF-TOKEN")
        .with_header_name("X-TEST-CSRF-TOKEN")
        .with_exclude_routes(["/health", "/api/public/*"])
        .with_cookie_secure(true)
        .with_cookie_same_site(SameSite::Strict)
        .with_cookie_path("/")
        .with_cookie_domain("example.com")
}

#[test]
fn test_csrf_options_from_json() {
    let options = CsrfOptions::from_json(
        r#"{"cookieName":"TEST-TOKEN","excludeRoutes":["/health"],"tokenLength":48}"#,
    )
    .unwrap();

    let gate = CsrfGate::new(options).unwrap();
    assert_eq!(gate.options().cookie_name, "TEST-TOKEN");
    assert_eq!(gate.codec().token_length(), 48);
    assert!(gate.evaluate(&RouteInfo::new("/health"), None, None).is_bypassed());
}

#[test]
fn test_unusable_options_are_refused_up_front() {
    let options = CsrfOptions::from_json(r#"{"tokenLifetimeMs": 1000000000000000}"#).unwrap();
    assert!(matches!(CsrfGate::new(options), Err(GateError::Config(_))));

    let options = CsrfOptions::new().with_token_lifetime(std::time::Duration::MAX);
    assert!(matches!(CsrfGate::new(options), Err(GateError::Config(_))));

    let options = CsrfOptions::new().with_cookie_name("XSRF\nTOKEN");
    assert!(matches!(CsrfGate::new(options), Err(GateError::Config(_))));

    let options = CsrfOptions::new().with_header_name("x-csrf\ntoken");
    assert!(matches!(CsrfGate::new(options), Err(GateError::Config(_))));
}

#[test]
fn test_longest_lifetime_still_issues_tokens() {
    let gate = CsrfGate::new(CsrfOptions::new().with_token_lifetime(xsrf_token::MAX_TOKEN_LIFETIME))
        .unwrap();
    let decision = gate.evaluate(&RouteInfo::new("/api/data"), None, None);

    assert!(decision.is_allowed());
    let token = gate.codec().decode(decision.cookie().unwrap().value()).unwrap();
    assert_eq!(token.use_count(), 1);
}

#[test]
fn test_default_cookie_name() {
    let gate = CsrfGate::new(CsrfOptions::default()).unwrap();
    let decision = gate.evaluate(&RouteInfo::new("/api/data"), None, None);
    assert_eq!(decision.cookie().unwrap().name(), "XSRF-TOKEN");
}

#[test]
fn test_cookie_attributes() {
    let gate = CsrfGate::new(test_options()).unwrap();
    let decision = gate.evaluate(&RouteInfo::new("/api/data"), None, None);
    let cookie = decision.cookie().unwrap();

    assert!(!cookie.http_only());
    assert!(cookie.secure());
    assert_eq!(cookie.same_site(), SameSite::Strict);
    assert_eq!(cookie.path(), "/");
    assert_eq!(cookie.domain(), Some("example.com"));
}

#[test]
fn test_token_lifecycle_until_cap() {
    let gate = CsrfGate::new(test_options()).unwrap();
    let route = RouteInfo::new("/api/data");

    let mut token = gate
        .evaluate(&route, None, None)
        .cookie()
        .unwrap()
        .value()
        .to_string();

    // Issued token already counts one use; nine more are allowed
    for expected in 2..=10 {
        let decision = gate.evaluate(&route, Some(&token), Some(&token));
        assert_eq!(decision.state(), Some(TokenState::TokenPairPresentValid));
        token = decision.cookie().unwrap().value().to_string();
        assert_eq!(gate.codec().decode(&token).unwrap().use_count(), expected);
    }

    let decision = gate.evaluate(&route, Some(&token), Some(&token));
    assert!(decision.is_rejected());
    assert!(decision.error().unwrap().is_max_uses_exceeded());
    assert_eq!(decision.error().unwrap().status_code(), 403);
}

#[test]
fn test_expiry_with_injected_clock() {
    let options = test_options().with_token_lifetime(std::time::Duration::from_secs(60));
    let gate = CsrfGate::new(options).unwrap();
    let route = RouteInfo::new("/api/data");
    let start = Utc::now();

    let token = gate
        .evaluate_at(&route, None, None, start)
        .cookie()
        .unwrap()
        .value()
        .to_string();

    let fresh = gate.evaluate_at(&route, Some(&token), Some(&token), start + Duration::seconds(30));
    assert_eq!(fresh.state(), Some(TokenState::TokenPairPresentValid));

    let stale = gate.evaluate_at(&route, Some(&token), Some(&token), start + Duration::seconds(61));
    assert_eq!(stale.state(), Some(TokenState::TokenPairPresentExpired));
    assert!(stale.is_allowed());
    assert_ne!(stale.cookie().unwrap().value(), token);
}

#[test]
fn test_http_round_trip() {
    let gate = CsrfGate::new(test_options()).unwrap();

    let first = protect(
        &gate,
        Request::builder().uri("/api/data").body(()).unwrap(),
        |_| Response::new("first".to_string()),
    );
    let set_cookie = first.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    let pair = set_cookie.split(';').next().unwrap();
    let token = pair.split_once('=').unwrap().1.to_string();

    let second = protect(
        &gate,
        Request::builder()
            .uri("/api/data")
            .header(COOKIE, pair)
            .header("x-test-csrf-token", token.as_str())
            .body(())
            .unwrap(),
        |_| Response::new("second".to_string()),
    );
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.body(), "second");

    let refreshed = second.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(!refreshed.contains(&token));
}

#[test]
fn test_handler_token_from_headers() {
    let gate = CsrfGate::new(test_options()).unwrap();

    let mut headers = http::HeaderMap::new();
    headers.insert(COOKIE, "TEST-CSRF-TOKEN=existing".parse().unwrap());
    let token = gate.handler_token_for(&headers).unwrap();
    assert_eq!(token.value, "existing");
    assert!(token.cookie.is_none());

    let token = gate.handler_token_for(&http::HeaderMap::new()).unwrap();
    assert!(token.cookie.is_some());
}
