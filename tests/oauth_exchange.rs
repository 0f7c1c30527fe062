use mockito::{Matcher, Server};
use serde_json::json;
use youtube_playlist_tools::api::youtube_auth::exchange_code;
use youtube_playlist_tools::secrets::ResolvedCredentials;

fn creds() -> ResolvedCredentials {
    ResolvedCredentials {
        client_id: "cid".into(),
        client_secret: "csecret".into(),
        api_key: None,
    }
}

#[test]
fn code_exchange_builds_stored_token() {
    let mut server = Server::new();
    let base = server.url();
    let m = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            Matcher::UrlEncoded("code".into(), "4/abc".into()),
            Matcher::UrlEncoded("code_verifier".into(), "verifier".into()),
            Matcher::UrlEncoded("client_secret".into(), "csecret".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "at",
                "expires_in": 3599,
                "refresh_token": "rt",
                "scope": "https://www.googleapis.com/auth/youtube",
                "token_type": "Bearer"
            })
            .to_string(),
        )
        .create();

    let rt = tokio::runtime::Runtime::new().unwrap();
    let token = rt
        .block_on(exchange_code(&base, &creds(), "4/abc", "verifier", "http://127.0.0.1:8080/"))
        .expect("exchange");
    assert_eq!(token.access_token, "at");
    assert_eq!(token.refresh_token.as_deref(), Some("rt"));
    assert!(!token.expires_within(60));
    m.assert();
}

#[test]
fn code_exchange_without_refresh_token_is_rejected() {
    let mut server = Server::new();
    let base = server.url();
    let _m = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "access_token": "at", "expires_in": 3599 }).to_string())
        .create();

    let rt = tokio::runtime::Runtime::new().unwrap();
    let err = rt
        .block_on(exchange_code(&base, &creds(), "c", "v", "http://127.0.0.1:8080/"))
        .unwrap_err();
    assert!(err.to_string().contains("refresh_token"));
}

#[test]
fn code_exchange_error_status_is_surfaced() {
    let mut server = Server::new();
    let base = server.url();
    let _m = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant"}"#)
        .create();

    let rt = tokio::runtime::Runtime::new().unwrap();
    let err = rt
        .block_on(exchange_code(&base, &creds(), "c", "v", "http://127.0.0.1:8080/"))
        .unwrap_err();
    assert!(err.to_string().contains("invalid_grant"));
}
