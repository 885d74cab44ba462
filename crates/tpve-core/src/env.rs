use std::collections::BTreeMap;

use crate::credentials::{CredentialSet, resolve_credentials};
use crate::descriptor::{ProxmoxConfig, ProxyConfig};

pub const PROXMOX_HOST: &str = "PROXMOX_HOST";
pub const PROXMOX_USER: &str = "PROXMOX_USER";
pub const PROXMOX_PASSWORD: &str = "PROXMOX_PASSWORD";
pub const PROXMOX_TOKEN_ID: &str = "PROXMOX_TOKEN_ID";
pub const PROXMOX_TOKEN_SECRET: &str = "PROXMOX_TOKEN_SECRET";
pub const PROXMOX_SKIP_TLS_VERIFY: &str = "PROXMOX_SKIP_TLS_VERIFY";

/// Variables layered over the inherited environment of one child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    vars: BTreeMap<String, String>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Auth, host, user and TLS settings for Proxmox tooling.
    pub fn hypervisor(cfg: &ProxmoxConfig) -> Self {
        let mut env = Self::new();
        match resolve_credentials(cfg).0 {
            CredentialSet::ApiToken { id, secret } => {
                env.set(PROXMOX_TOKEN_ID, id);
                env.set(PROXMOX_TOKEN_SECRET, secret);
            }
            CredentialSet::Password(pw) => env.set(PROXMOX_PASSWORD, pw),
            CredentialSet::None => {}
        }
        env.set(PROXMOX_HOST, &cfg.host);
        env.set(PROXMOX_USER, &cfg.user);
        if cfg.skip_tls_verify {
            env.set(PROXMOX_SKIP_TLS_VERIFY, "1");
        }
        env
    }

    /// Upper- and lower-case proxy variables, only while proxying is enabled.
    pub fn proxy(cfg: &ProxyConfig) -> Self {
        let mut env = Self::new();
        if !cfg.enabled {
            return env;
        }
        for (upper, lower, value) in [
            ("HTTP_PROXY", "http_proxy", &cfg.http_proxy),
            ("HTTPS_PROXY", "https_proxy", &cfg.https_proxy),
            ("NO_PROXY", "no_proxy", &cfg.no_proxy),
        ] {
            if !value.is_empty() {
                env.set(upper, value);
                env.set(lower, value);
            }
        }
        env
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Layer `other` on top of `self`; `other` wins on conflicts.
    pub fn merge(mut self, other: EnvOverlay) -> Self {
        self.vars.extend(other.vars);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }
}
