use super::*;
use crate::identity::config::IdentityTimeouts;
use crate::identity::types::{GOOGLE_PROVIDER_ID, IdentityErrorKind};

fn test_config() -> IdentityConfig {
    IdentityConfig {
        api_key: "k".into(),
        base_url: "http://localhost:9099/identitytoolkit.googleapis.com/v1".into(),
        token_url: "http://localhost:9099/securetoken.googleapis.com/v1/token".into(),
        request_uri: "http://localhost".into(),
        timeouts: IdentityTimeouts { request_secs: 1, connect_secs: 1 },
    }
}

// =============================================================================
// accounts_url / federated_post_body
// =============================================================================

#[test]
fn accounts_url_includes_method_and_key() {
    let url = accounts_url(&test_config(), "signUp");
    assert_eq!(url, "http://localhost:9099/identitytoolkit.googleapis.com/v1/accounts:signUp?key=k");
}

#[test]
fn federated_post_body_with_id_token() {
    let body = federated_post_body(&FederatedCredential::google("tok"));
    assert_eq!(body, "id_token=tok&providerId=google.com");
}

#[test]
fn federated_post_body_with_both_tokens() {
    let cred = FederatedCredential {
        provider_id: GOOGLE_PROVIDER_ID.into(),
        id_token: Some("id".into()),
        access_token: Some("acc".into()),
    };
    assert_eq!(federated_post_body(&cred), "id_token=id&access_token=acc&providerId=google.com");
}

#[test]
fn federated_post_body_skips_blank_tokens() {
    let cred = FederatedCredential {
        provider_id: GOOGLE_PROVIDER_ID.into(),
        id_token: Some(String::new()),
        access_token: Some("acc".into()),
    };
    assert_eq!(federated_post_body(&cred), "access_token=acc&providerId=google.com");
}

// =============================================================================
// parse_error_body
// =============================================================================

#[test]
fn error_body_plain_code() {
    let body = r#"{"error":{"code":400,"message":"EMAIL_EXISTS","errors":[]}}"#;
    let err = parse_error_body(400, body);
    assert_eq!(err.kind(), IdentityErrorKind::DuplicateEmail);
    assert_eq!(err.to_string(), "EMAIL_EXISTS");
}

#[test]
fn error_body_code_with_detail_keeps_full_message() {
    let body = r#"{"error":{"code":400,"message":"WEAK_PASSWORD : Password should be at least 6 characters"}}"#;
    let err = parse_error_body(400, body);
    assert_eq!(err.kind(), IdentityErrorKind::WeakPassword);
    assert_eq!(err.to_string(), "WEAK_PASSWORD : Password should be at least 6 characters");
    match err {
        IdentityError::Provider { code, .. } => assert_eq!(code, "WEAK_PASSWORD"),
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[test]
fn error_body_unparseable_5xx_is_network() {
    let err = parse_error_body(503, "<html>upstream down</html>");
    assert_eq!(err.kind(), IdentityErrorKind::Network);
}

#[test]
fn error_body_unparseable_4xx_is_parse_error() {
    let err = parse_error_body(404, "not json");
    assert!(matches!(err, IdentityError::Parse(_)));
}

// =============================================================================
// parse_auth_response
// =============================================================================

#[test]
fn auth_response_sign_up_shape() {
    let body = r#"{"kind":"identitytoolkit#SignupNewUserResponse","idToken":"id-1","email":"jane@example.com","refreshToken":"r-1","expiresIn":"3600","localId":"uid-1"}"#;
    let session = parse_auth_response(body, PASSWORD_PROVIDER_ID).unwrap();
    assert_eq!(session.identity.uid, "uid-1");
    assert_eq!(session.identity.email.as_deref(), Some("jane@example.com"));
    assert_eq!(session.identity.display_name, None);
    assert_eq!(session.identity.providers, vec!["password".to_string()]);
    assert_eq!(session.id_token, "id-1");
    assert_eq!(session.refresh_token.as_deref(), Some("r-1"));
}

#[test]
fn auth_response_empty_display_name_is_none() {
    let body = r#"{"localId":"uid-2","email":"a@b.c","displayName":"","idToken":"t","registered":true}"#;
    let session = parse_auth_response(body, PASSWORD_PROVIDER_ID).unwrap();
    assert_eq!(session.identity.display_name, None);
}

#[test]
fn auth_response_idp_uses_reported_provider() {
    let body = r#"{"federatedId":"https://accounts.google.com/123","providerId":"google.com","localId":"uid-3","email":"jane.doe@example.com","displayName":"Jane Doe","idToken":"t"}"#;
    let session = parse_auth_response(body, "fallback").unwrap();
    assert_eq!(session.identity.providers, vec!["google.com".to_string()]);
    assert_eq!(session.identity.display_name.as_deref(), Some("Jane Doe"));
}

#[test]
fn auth_response_missing_local_id_fails() {
    let err = parse_auth_response(r#"{"idToken":"t"}"#, PASSWORD_PROVIDER_ID).unwrap_err();
    assert!(matches!(err, IdentityError::Parse(_)));
}

// =============================================================================
// parse_refresh_response / parse_lookup_response
// =============================================================================

#[test]
fn refresh_response_reads_snake_case_token() {
    let body = r#"{"expires_in":"3600","token_type":"Bearer","refresh_token":"r","id_token":"fresh","user_id":"u"}"#;
    assert_eq!(parse_refresh_response(body).unwrap(), "fresh");
}

#[test]
fn lookup_response_first_user() {
    let body = r#"{"users":[{"localId":"u1","email":"x@y.z","displayName":"xy","providerUserInfo":[{"providerId":"password"},{"providerId":"google.com"}]}]}"#;
    let identity = parse_lookup_response(body).unwrap().unwrap();
    assert_eq!(identity.uid, "u1");
    assert_eq!(identity.display_name.as_deref(), Some("xy"));
    assert_eq!(identity.providers, vec!["password".to_string(), "google.com".to_string()]);
}

#[test]
fn lookup_response_no_users_is_none() {
    assert!(parse_lookup_response(r#"{"kind":"identitytoolkit#GetAccountInfoResponse"}"#).unwrap().is_none());
}

// =============================================================================
// FirebaseIdentity without network
// =============================================================================

#[tokio::test]
async fn empty_federated_credential_is_rejected_locally() {
    let client = FirebaseIdentity::new(test_config()).unwrap();
    let err = client.authenticate_federated(&FederatedCredential::default()).await.unwrap_err();
    assert_eq!(err.kind(), IdentityErrorKind::FederatedCancelled);
}

#[tokio::test]
async fn issue_token_reuses_fresh_id_token() {
    let client = FirebaseIdentity::new(test_config()).unwrap();
    let session = ProviderSession {
        identity: AccountIdentity { uid: "u".into(), email: None, display_name: None, providers: vec![] },
        id_token: "already-fresh".into(),
        refresh_token: None,
    };
    assert_eq!(client.issue_token(&session).await.unwrap(), "already-fresh");
}

#[tokio::test]
async fn sign_out_is_local() {
    let client = FirebaseIdentity::new(test_config()).unwrap();
    assert!(client.sign_out(None).await.is_ok());
    assert!(client.sign_out(Some("token")).await.is_ok());
}
