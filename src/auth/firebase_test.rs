use super::*;
use serde_json::json;

#[test]
fn parse_sign_in_success() {
    let body = json!({
        "kind": "identitytoolkit#VerifyPasswordResponse",
        "localId": "uid-1",
        "email": "admin@ferreteria.ni",
        "displayName": "",
        "idToken": "eyJ.token",
        "registered": true,
        "refreshToken": "refresh",
        "expiresIn": "3600"
    })
    .to_string();
    let user = parse_sign_in(&body).unwrap();
    assert_eq!(user.uid, "uid-1");
    assert_eq!(user.email, "admin@ferreteria.ni");
    assert_eq!(user.id_token, "eyJ.token");
}

#[test]
fn parse_sign_in_rejects_missing_token() {
    let body = json!({ "localId": "uid-1", "email": "a@b.c" }).to_string();
    assert!(matches!(parse_sign_in(&body), Err(AuthError::Parse(_))));
}

#[test]
fn classify_bad_credentials() {
    let body = json!({ "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS", "errors": [] } }).to_string();
    assert!(matches!(classify_error(400, &body), AuthError::InvalidCredentials));

    let body = json!({ "error": { "code": 400, "message": "INVALID_PASSWORD : The password is invalid." } }).to_string();
    assert!(matches!(classify_error(400, &body), AuthError::InvalidCredentials));
}

#[test]
fn classify_other_errors_keep_status() {
    let body = json!({ "error": { "code": 400, "message": "TOO_MANY_ATTEMPTS_TRY_LATER" } }).to_string();
    assert!(matches!(
        classify_error(400, &body),
        AuthError::Status { status: 400, ref message } if message == "TOO_MANY_ATTEMPTS_TRY_LATER"
    ));
    assert!(matches!(classify_error(503, "unavailable"), AuthError::Status { status: 503, .. }));
}

#[test]
fn sign_in_request_uses_camel_case() {
    let body = serde_json::to_value(SignInRequest { email: "a@b.c", password: "pw", return_secure_token: true }).unwrap();
    assert_eq!(body, json!({ "email": "a@b.c", "password": "pw", "returnSecureToken": true }));
}
