//! Thin Auth0/OIDC capability boundary: authorization-code redirect and
//! exchange, plus decoding the ID token's `email` claim. This is
//! deliberately not a general-purpose OIDC client — the core only ever
//! needs four HTTP-adjacent operations, matching the reference daemon's
//! preference for a small typed `reqwest` struct per external collaborator
//! over a heavyweight SDK.
//!
//! Per the spec's explicit scoping, the login handshake is a capability
//! boundary only: the ID token's signature is not verified here. Trust in
//! the claim rests on the exchange happening over TLS directly against the
//! tenant's configured Auth0 domain, not on recomputing the issuer's
//! signature locally.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::auth::types::{IdTokenClaims, TokenExchangeResponse};
use crate::tenant::model::Auth0Config;

/// Build the Auth0 `/authorize` redirect URL. `callback_url` is computed
/// per request from the incoming `Host` header, never stored in config, so
/// one process can serve the login flow for many hostnames.
#[must_use]
pub fn build_authorize_url(auth0: &Auth0Config, callback_url: &str, state: &str) -> Option<String> {
    let domain = auth0.domain.as_deref()?;
    let client_id = auth0.client_id.as_deref()?;
    Some(format!(
        "https://{domain}/authorize?response_type=code&client_id={client_id}&redirect_uri={}&scope=openid%20email&state={state}",
        urlencoding_escape(callback_url)
    ))
}

/// Exchange an authorization `code` for an ID token, then decode (without
/// signature verification — see module docs) its `email` claim.
pub async fn exchange_code_for_email(
    client: &reqwest::Client,
    auth0: &Auth0Config,
    client_secret: &str,
    callback_url: &str,
    code: &str,
) -> Result<String, anyhow::Error> {
    let domain = auth0.domain.as_deref().ok_or_else(|| anyhow::anyhow!("tenant has no auth0.domain configured"))?;
    let client_id = auth0.client_id.as_deref().ok_or_else(|| anyhow::anyhow!("tenant has no auth0.client_id configured"))?;

    let response = client
        .post(format!("https://{domain}/oauth/token"))
        .json(&serde_json::json!({
            "grant_type": "authorization_code",
            "client_id": client_id,
            "client_secret": client_secret,
            "code": code,
            "redirect_uri": callback_url,
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        anyhow::bail!("auth0 token exchange failed with status {}", response.status());
    }

    let body: TokenExchangeResponse = response.json().await?;
    decode_id_token_email(&body.id_token)
}

fn decode_id_token_email(id_token: &str) -> Result<String, anyhow::Error> {
    let mut parts = id_token.split('.');
    let _header = parts.next().ok_or_else(|| anyhow::anyhow!("malformed id_token"))?;
    let payload = parts.next().ok_or_else(|| anyhow::anyhow!("malformed id_token"))?;

    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes)?;
    Ok(claims.email)
}

fn urlencoding_escape(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_authorize_url_is_none_without_domain_or_client_id() {
        let auth0 = Auth0Config::default();
        assert!(build_authorize_url(&auth0, "https://host/auth/callback", "state123").is_none());
    }

    #[test]
    fn build_authorize_url_includes_the_escaped_callback_and_state() {
        let auth0 = Auth0Config { domain: Some("acme.auth0.com".to_string()), client_id: Some("abc123".to_string()), ..Default::default() };
        let url = build_authorize_url(&auth0, "https://host.example.com/auth/callback", "state123").unwrap();
        assert!(url.starts_with("https://acme.auth0.com/authorize?"));
        assert!(url.contains("client_id=abc123"));
        assert!(url.contains("state=state123"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fhost.example.com%2Fauth%2Fcallback"));
    }

    #[test]
    fn decode_id_token_email_reads_the_email_claim() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"email":"admin@example.com"}"#);
        let token = format!("header.{payload}.signature");
        assert_eq!(decode_id_token_email(&token).unwrap(), "admin@example.com");
    }

    #[test]
    fn decode_id_token_email_rejects_a_malformed_token() {
        assert!(decode_id_token_email("not-a-jwt").is_err());
    }
}
