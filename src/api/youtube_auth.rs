use super::youtube::YouTubeClient;
use crate::secrets::ResolvedCredentials;
use crate::token_store::{StoredToken, TokenStore};
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::io::BufRead;
use tracing::info;
use url::Url;

pub const YOUTUBE_SCOPE: &str = "https://www.googleapis.com/auth/youtube";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/";

/// Manual OAuth setup:
/// 1. Print the Google consent URL (PKCE S256, offline access).
/// 2. User approves and gets redirected to the redirect URI (which may fail to load; that's fine).
/// 3. User pastes the full redirect URL back here.
/// 4. The `code` param is exchanged for an access_token + refresh_token.
/// 5. The token is written through the token store.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: i64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

fn generate_code_verifier() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

fn code_challenge_s256(verifier: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

pub fn authorization_url(client_id: &str, redirect_uri: &str, code_challenge: &str) -> Result<Url> {
    let mut url = Url::parse("https://accounts.google.com/o/oauth2/v2/auth")?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", YOUTUBE_SCOPE)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .append_pair("code_challenge", code_challenge)
        .append_pair("code_challenge_method", "S256");
    Ok(url)
}

/// Pull the `code` query parameter out of a pasted redirect URL.
pub fn extract_code(redirect_url: &str) -> Result<String> {
    let parsed = Url::parse(redirect_url.trim()).map_err(|e| anyhow!("invalid url pasted: {}", e))?;
    if let Some((_, err)) = parsed.query_pairs().find(|(k, _)| k == "error") {
        return Err(anyhow!("authorization denied: {}", err));
    }
    Ok(parsed
        .query_pairs()
        .find(|(k, _)| k == "code")
        .ok_or_else(|| anyhow!("no code in redirect URL"))?
        .1
        .into_owned())
}

pub async fn exchange_code(
    auth_base: &str,
    creds: &ResolvedCredentials,
    code: &str,
    code_verifier: &str,
    redirect_uri: &str,
) -> Result<StoredToken> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("code_verifier", code_verifier),
        ("redirect_uri", redirect_uri),
        ("client_id", creds.client_id.as_str()),
        ("client_secret", creds.client_secret.as_str()),
    ];
    let url = format!("{}/token", auth_base.trim_end_matches('/'));
    let resp = Client::new().post(&url).form(&params).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(anyhow!("token exchange failed: {} => {}", status, txt));
    }
    let tr: TokenResponse = resp.json().await?;
    if tr.refresh_token.is_none() {
        return Err(anyhow!(
            "token response has no refresh_token; revoke the app's access and authorize again"
        ));
    }
    Ok(StoredToken {
        access_token: tr.access_token,
        token_type: tr.token_type.unwrap_or_else(|| "Bearer".into()),
        expires_at: chrono::Utc::now().timestamp() + tr.expires_in,
        refresh_token: tr.refresh_token,
        scope: tr.scope,
    })
}

pub async fn run_youtube_auth(creds: &ResolvedCredentials, store: &dyn TokenStore) -> Result<()> {
    let verifier = generate_code_verifier();
    let challenge = code_challenge_s256(&verifier);
    let url = authorization_url(&creds.client_id, DEFAULT_REDIRECT_URI, &challenge)?;

    println!(
        "Open this URL in your browser and authorize the application:\n\n{}\n",
        url
    );
    println!("After authorizing, you'll be redirected to {}. Copy the full redirect URL and paste it here.", DEFAULT_REDIRECT_URI);
    println!("Paste redirect URL:");
    let mut input = String::new();
    std::io::stdin().lock().read_line(&mut input)?;
    let code = extract_code(&input)?;

    let auth_base = YouTubeClient::default_auth_base();
    let token = exchange_code(&auth_base, creds, &code, &verifier, DEFAULT_REDIRECT_URI).await?;
    store.save(&token)?;
    info!("YouTube OAuth token saved");
    println!("Saved token. You can now run the migration.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_is_url_safe_sha256() {
        // RFC 7636 appendix B
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            code_challenge_s256(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
        assert_eq!(generate_code_verifier().len(), 64);
    }

    #[test]
    fn auth_url_requests_offline_youtube_scope() {
        let url = authorization_url("cid", DEFAULT_REDIRECT_URI, "chal").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("access_type".into(), "offline".into())));
        assert!(pairs.contains(&("scope".into(), YOUTUBE_SCOPE.into())));
        assert!(pairs.contains(&("code_challenge".into(), "chal".into())));
    }

    #[test]
    fn extracts_code_or_reports_denial() {
        assert_eq!(
            extract_code("http://127.0.0.1:8080/?code=4%2Fabc&scope=x\n").unwrap(),
            "4/abc"
        );
        assert!(extract_code("http://127.0.0.1:8080/?error=access_denied").is_err());
        assert!(extract_code("http://127.0.0.1:8080/").is_err());
        assert!(extract_code("not a url").is_err());
    }
}
