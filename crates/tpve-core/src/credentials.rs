//! Hypervisor credential resolution.
//!
//! An explicit `auth_method` is honored exclusively. Without one, a complete
//! API token pair wins over a password, which keeps descriptors written
//! before `auth_method` existed working. Resolution never fails: missing
//! credentials become a warning and the wrapped tool reports the real error.

use std::fmt;

use crate::descriptor::{AuthMethod, ProxmoxConfig};

/// Credential variables handed to hypervisor tooling.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSet {
    ApiToken { id: String, secret: String },
    Password(String),
    None,
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSet::ApiToken { id, .. } => f
                .debug_struct("ApiToken")
                .field("id", id)
                .field("secret", &"<redacted>")
                .finish(),
            CredentialSet::Password(_) => f.write_str("Password(<redacted>)"),
            CredentialSet::None => f.write_str("None"),
        }
    }
}

/// Non-fatal problem found while resolving credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialWarning {
    /// `auth_method: api_token` without both `api_token_id` and `api_token`.
    MissingApiToken,
    /// `auth_method: password` without `password`.
    MissingPassword,
    /// No method declared but both a token pair and a password are set.
    AmbiguousCredentials,
}

impl fmt::Display for CredentialWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialWarning::MissingApiToken => f.write_str(
                "auth_method is api_token but api_token_id or api_token is not configured",
            ),
            CredentialWarning::MissingPassword => {
                f.write_str("auth_method is password but password is not configured")
            }
            CredentialWarning::AmbiguousCredentials => f.write_str(
                "both an API token and a password are configured without auth_method; using the API token",
            ),
        }
    }
}

fn token_pair(cfg: &ProxmoxConfig) -> Option<CredentialSet> {
    (!cfg.api_token_id.is_empty() && !cfg.api_token.is_empty()).then(|| CredentialSet::ApiToken {
        id: cfg.api_token_id.clone(),
        secret: cfg.api_token.clone(),
    })
}

fn password(cfg: &ProxmoxConfig) -> Option<CredentialSet> {
    (!cfg.password.is_empty()).then(|| CredentialSet::Password(cfg.password.clone()))
}

/// Pick the credential set for hypervisor calls.
pub fn resolve_credentials(cfg: &ProxmoxConfig) -> (CredentialSet, Option<CredentialWarning>) {
    match cfg.auth_method {
        Some(AuthMethod::ApiToken) => match token_pair(cfg) {
            Some(set) => (set, None),
            None => (
                CredentialSet::None,
                Some(CredentialWarning::MissingApiToken),
            ),
        },
        Some(AuthMethod::Password) => match password(cfg) {
            Some(set) => (set, None),
            None => (
                CredentialSet::None,
                Some(CredentialWarning::MissingPassword),
            ),
        },
        None => match (token_pair(cfg), password(cfg)) {
            (Some(token), Some(_)) => (token, Some(CredentialWarning::AmbiguousCredentials)),
            (Some(token), None) => (token, None),
            (None, Some(pw)) => (pw, None),
            (None, None) => (CredentialSet::None, None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(method: Option<AuthMethod>, token: bool, pw: bool) -> ProxmoxConfig {
        let mut cfg: ProxmoxConfig = serde_yaml::from_str("host: pve").unwrap();
        cfg.auth_method = method;
        if token {
            cfg.api_token_id = "root@pam!deploy".to_string();
            cfg.api_token = "secret-uuid".to_string();
        }
        if pw {
            cfg.password = "hunter2".to_string();
        }
        cfg
    }

    #[test]
    fn test_explicit_token_ignores_password() {
        let (set, warn) = resolve_credentials(&cfg(Some(AuthMethod::ApiToken), true, true));
        assert!(matches!(set, CredentialSet::ApiToken { .. }));
        assert_eq!(warn, None);
    }

    #[test]
    fn test_explicit_password_ignores_token() {
        let (set, warn) = resolve_credentials(&cfg(Some(AuthMethod::Password), true, true));
        assert_eq!(set, CredentialSet::Password("hunter2".to_string()));
        assert_eq!(warn, None);
    }

    #[test]
    fn test_explicit_method_missing_fields_warns() {
        let (set, warn) = resolve_credentials(&cfg(Some(AuthMethod::ApiToken), false, true));
        assert_eq!(set, CredentialSet::None);
        assert_eq!(warn, Some(CredentialWarning::MissingApiToken));

        let (set, warn) = resolve_credentials(&cfg(Some(AuthMethod::Password), true, false));
        assert_eq!(set, CredentialSet::None);
        assert_eq!(warn, Some(CredentialWarning::MissingPassword));
    }

    #[test]
    fn test_half_configured_token_is_missing() {
        let mut c = cfg(Some(AuthMethod::ApiToken), true, false);
        c.api_token.clear();
        let (set, warn) = resolve_credentials(&c);
        assert_eq!(set, CredentialSet::None);
        assert_eq!(warn, Some(CredentialWarning::MissingApiToken));
    }

    #[test]
    fn test_fallback_prefers_token_and_always_warns_when_ambiguous() {
        let (set, warn) = resolve_credentials(&cfg(None, true, true));
        assert!(matches!(set, CredentialSet::ApiToken { .. }));
        assert_eq!(warn, Some(CredentialWarning::AmbiguousCredentials));
    }

    #[test]
    fn test_fallback_single_source() {
        let (set, warn) = resolve_credentials(&cfg(None, false, true));
        assert!(matches!(set, CredentialSet::Password(_)));
        assert_eq!(warn, None);

        let (set, warn) = resolve_credentials(&cfg(None, true, false));
        assert!(matches!(set, CredentialSet::ApiToken { .. }));
        assert_eq!(warn, None);
    }

    #[test]
    fn test_fallback_nothing_configured_is_silent() {
        let (set, warn) = resolve_credentials(&cfg(None, false, false));
        assert_eq!(set, CredentialSet::None);
        assert_eq!(warn, None);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let (set, _) = resolve_credentials(&cfg(None, true, false));
        let dbg = format!("{set:?}");
        assert!(dbg.contains("root@pam!deploy"));
        assert!(!dbg.contains("secret-uuid"));
    }
}
