use super::*;

// =============================================================================
// IdentityErrorKind::from_provider_code
// =============================================================================

#[test]
fn provider_codes_map_to_kinds() {
    let cases = [
        ("EMAIL_EXISTS", IdentityErrorKind::DuplicateEmail),
        ("INVALID_EMAIL", IdentityErrorKind::InvalidEmail),
        ("WEAK_PASSWORD", IdentityErrorKind::WeakPassword),
        ("INVALID_LOGIN_CREDENTIALS", IdentityErrorKind::InvalidCredentials),
        ("EMAIL_NOT_FOUND", IdentityErrorKind::InvalidCredentials),
        ("INVALID_PASSWORD", IdentityErrorKind::InvalidCredentials),
        ("USER_DISABLED", IdentityErrorKind::UserDisabled),
        ("TOO_MANY_ATTEMPTS_TRY_LATER", IdentityErrorKind::RateLimited),
        ("INVALID_ID_TOKEN", IdentityErrorKind::InvalidToken),
        ("TOKEN_EXPIRED", IdentityErrorKind::InvalidToken),
        ("POPUP_CLOSED_BY_USER", IdentityErrorKind::FederatedCancelled),
    ];
    for (code, expected) in cases {
        assert_eq!(IdentityErrorKind::from_provider_code(code), expected, "code {code}");
    }
}

#[test]
fn unknown_provider_code_is_other() {
    assert_eq!(IdentityErrorKind::from_provider_code("SOMETHING_NEW"), IdentityErrorKind::Other);
}

// =============================================================================
// IdentityError
// =============================================================================

#[test]
fn provider_error_displays_message_verbatim() {
    let err = IdentityError::provider("WEAK_PASSWORD", "WEAK_PASSWORD : Password should be at least 6 characters");
    assert_eq!(err.to_string(), "WEAK_PASSWORD : Password should be at least 6 characters");
    assert_eq!(err.kind(), IdentityErrorKind::WeakPassword);
    assert_eq!(err.error_code(), "E_WEAK_PASSWORD");
}

#[test]
fn request_error_is_network_kind() {
    let err = IdentityError::Request("connection refused".into());
    assert_eq!(err.kind(), IdentityErrorKind::Network);
    assert_eq!(err.to_string(), "connection refused");
}

#[test]
fn parse_error_is_other_kind() {
    let err = IdentityError::Parse("unexpected body".into());
    assert_eq!(err.kind(), IdentityErrorKind::Other);
    assert_eq!(err.error_code(), "E_IDENTITY_SERVICE");
}

// =============================================================================
// FederatedCredential
// =============================================================================

#[test]
fn federated_credential_defaults_to_google() {
    let cred: FederatedCredential = serde_json::from_str(r#"{"id_token":"abc"}"#).unwrap();
    assert_eq!(cred.provider_id, GOOGLE_PROVIDER_ID);
    assert_eq!(cred.id_token.as_deref(), Some("abc"));
    assert!(!cred.is_empty());
}

#[test]
fn federated_credential_without_tokens_is_empty() {
    let cred: FederatedCredential = serde_json::from_str("{}").unwrap();
    assert!(cred.is_empty());

    let blank = FederatedCredential { id_token: Some(String::new()), ..FederatedCredential::default() };
    assert!(blank.is_empty());
}

#[test]
fn federated_credential_access_token_only_is_not_empty() {
    let cred = FederatedCredential { access_token: Some("ya29".into()), ..FederatedCredential::google("") };
    assert!(!cred.is_empty());
}

// =============================================================================
// AccountIdentity
// =============================================================================

#[test]
fn account_identity_serializes_with_snake_case_fields() {
    let identity = AccountIdentity {
        uid: "u1".into(),
        email: Some("jane@example.com".into()),
        display_name: None,
        providers: vec!["password".into()],
    };
    let json = serde_json::to_value(&identity).unwrap();
    assert_eq!(json["uid"], "u1");
    assert_eq!(json["email"], "jane@example.com");
    assert!(json["display_name"].is_null());
    assert_eq!(json["providers"][0], "password");
}
