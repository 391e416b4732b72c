use super::*;
use axum::Router;
use axum::body::Body;
use axum::http::{self, StatusCode, header};
use axum::routing::get;
use tower::ServiceExt;

use crate::identity::AccountIdentity;
use crate::state::test_helpers::{harness, harness_with_gate};

// =============================================================================
// classify / decide
// =============================================================================

#[test]
fn classifies_home_and_its_subpaths_as_protected() {
    let routes = GateRoutes::default();
    assert_eq!(routes.classify("/dashboard"), RouteClass::Protected);
    assert_eq!(routes.classify("/dashboard/"), RouteClass::Protected);
    assert_eq!(routes.classify("/dashboard/settings/profile"), RouteClass::Protected);
}

#[test]
fn prefix_lookalikes_are_not_protected() {
    let routes = GateRoutes::default();
    assert_eq!(routes.classify("/dashboards"), RouteClass::Unrestricted);
    assert_eq!(routes.classify("/dashboard-old"), RouteClass::Unrestricted);
}

#[test]
fn entry_route_matches_exactly() {
    let routes = GateRoutes::default();
    assert_eq!(routes.classify("/sign-up"), RouteClass::PublicOnly);
    assert_eq!(routes.classify("/sign-up/extra"), RouteClass::Unrestricted);
    assert_eq!(routes.classify("/"), RouteClass::Unrestricted);
    assert_eq!(routes.classify("/api/auth/sign-in"), RouteClass::Unrestricted);
}

#[test]
fn decision_table() {
    let routes = GateRoutes::default();
    let cases = [
        (RouteClass::Protected, SessionPresence::Absent, GateDecision::Redirect("/sign-up".into())),
        (RouteClass::PublicOnly, SessionPresence::Present, GateDecision::Redirect("/dashboard".into())),
        (RouteClass::Protected, SessionPresence::Present, GateDecision::Allow),
        (RouteClass::PublicOnly, SessionPresence::Absent, GateDecision::Allow),
        (RouteClass::Unrestricted, SessionPresence::Present, GateDecision::Allow),
        (RouteClass::Unrestricted, SessionPresence::Absent, GateDecision::Allow),
    ];
    for (class, presence, expected) in cases {
        assert_eq!(routes.decide(class, presence), expected, "{class:?} / {presence:?}");
    }
}

#[test]
fn custom_routes_are_honored() {
    let routes = GateRoutes::new("/login", "/app");
    assert_eq!(routes.evaluate("/app/boards", SessionPresence::Absent), GateDecision::Redirect("/login".into()));
    assert_eq!(routes.evaluate("/login", SessionPresence::Present), GateDecision::Redirect("/app".into()));
    assert_eq!(routes.evaluate("/dashboard", SessionPresence::Absent), GateDecision::Allow);
}

// =============================================================================
// view_decision
// =============================================================================

fn someone() -> AccountIdentity {
    AccountIdentity { uid: "u1".into(), email: None, display_name: None, providers: vec![] }
}

#[test]
fn loading_renders_nothing_anywhere() {
    let routes = GateRoutes::default();
    for path in ["/dashboard", "/sign-up", "/about"] {
        assert_eq!(routes.view_decision(path, &AuthState::Loading), ViewDecision::Pending);
    }
}

#[test]
fn resolved_view_agrees_with_edge_table() {
    let routes = GateRoutes::default();
    for path in ["/dashboard", "/dashboard/x", "/sign-up", "/about"] {
        for (state, presence) in [
            (AuthState::Authenticated(someone()), SessionPresence::Present),
            (AuthState::Unauthenticated, SessionPresence::Absent),
        ] {
            let edge = routes.evaluate(path, presence);
            let view = routes.view_decision(path, &state);
            let expected = match edge {
                GateDecision::Allow => ViewDecision::Allow,
                GateDecision::Redirect(to) => ViewDecision::Redirect(to),
            };
            assert_eq!(view, expected, "{path} {presence:?}");
        }
    }
}

// =============================================================================
// edge_gate middleware
// =============================================================================

fn gated(state: AppState) -> Router {
    Router::new()
        .route("/dashboard", get(|| async { "home" }))
        .route("/dashboard/settings", get(|| async { "settings" }))
        .route("/sign-up", get(|| async { "entry" }))
        .route("/about", get(|| async { "about" }))
        .layer(axum::middleware::from_fn_with_state(state.clone(), edge_gate))
        .with_state(state)
}

async fn fetch(state: AppState, uri: &str, cookie: Option<&str>) -> Response {
    let mut builder = http::Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    gated(state).oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
}

fn location(resp: &Response) -> &str {
    resp.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

#[tokio::test]
async fn protected_without_cookie_redirects_to_entry() {
    let h = harness();
    let resp = fetch(h.state, "/dashboard", None).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/sign-up");
}

#[tokio::test]
async fn protected_subpath_without_cookie_redirects() {
    let h = harness();
    let resp = fetch(h.state, "/dashboard/settings", None).await;
    assert_eq!(location(&resp), "/sign-up");
}

#[tokio::test]
async fn entry_with_cookie_redirects_home() {
    let h = harness();
    let resp = fetch(h.state, "/sign-up", Some("session=anything")).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/dashboard");
}

#[tokio::test]
async fn protected_with_cookie_passes_through() {
    let h = harness();
    let resp = fetch(h.state, "/dashboard", Some("session=anything")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"home");
}

#[tokio::test]
async fn entry_without_cookie_and_unrestricted_pass_through() {
    let h = harness();
    assert_eq!(fetch(h.state.clone(), "/sign-up", None).await.status(), StatusCode::OK);
    assert_eq!(fetch(h.state, "/about", Some("session=x")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_cookie_counts_as_absent() {
    let h = harness();
    let resp = fetch(h.state, "/dashboard", Some("session=")).await;
    assert_eq!(location(&resp), "/sign-up");
}

#[tokio::test]
async fn presence_mode_never_calls_the_provider() {
    let h = harness();
    fetch(h.state, "/dashboard", Some("session=stale")).await;
    assert!(h.identity.calls().is_empty());
}

#[tokio::test]
async fn verify_mode_rejects_unknown_token() {
    let h = harness_with_gate(GateConfig { verify_tokens: true, ..GateConfig::default() });
    let resp = fetch(h.state, "/dashboard", Some("session=stale")).await;
    assert_eq!(location(&resp), "/sign-up");
}

#[tokio::test]
async fn verify_mode_accepts_live_token() {
    let h = harness_with_gate(GateConfig { verify_tokens: true, ..GateConfig::default() });
    let uid = h.identity.add_account("v@example.com", "hunter22", None);
    let cookie = format!("session={}", h.identity.token_for(&uid));

    let resp = fetch(h.state.clone(), "/dashboard", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = fetch(h.state, "/sign-up", Some(&cookie)).await;
    assert_eq!(location(&resp), "/dashboard");
}

#[tokio::test]
async fn verify_mode_treats_provider_outage_as_absent() {
    let h = harness_with_gate(GateConfig { verify_tokens: true, ..GateConfig::default() });
    h.identity
        .fail_next("current_identity", crate::identity::IdentityError::Request("offline".into()));
    let resp = fetch(h.state, "/dashboard", Some("session=tok-1")).await;
    assert_eq!(location(&resp), "/sign-up");
}
