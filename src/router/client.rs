// REST client for Sagemcom routers (Ziggo-style dialect)
//
// Thin sequential wrapper around the router's undocumented REST API.
// Transport failures never cross this boundary: every operation catches,
// logs, and degrades to a negative result (false / empty list).

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use super::password::{self, resolve_password};
use super::rule::{rules_from_envelope, PortForwardingRule, RemoteRule, RuleListEnvelope};
use crate::config::RouterConfig;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Business failures when removing a rule by external port.
///
/// The dialect has no unique secondary key, so multiple rules sharing an
/// external port cannot be disambiguated. Refusing is deliberate; do not
/// replace this with a first-match heuristic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemoveError {
    #[error("no port forward rule found for external port {0}")]
    NotFound(u16),
    #[error("{count} rules share external port {port}, refusing to guess which to delete")]
    Ambiguous { port: u16, count: usize },
}

/// Find the single rule matching an external port.
pub fn find_rule_by_port(rules: &[RemoteRule], external_port: u16) -> Result<&RemoteRule, RemoveError> {
    let matches: Vec<&RemoteRule> = rules
        .iter()
        .filter(|r| r.external_port == external_port)
        .collect();

    match matches.len() {
        0 => Err(RemoveError::NotFound(external_port)),
        1 => Ok(matches[0]),
        count => Err(RemoveError::Ambiguous {
            port: external_port,
            count,
        }),
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    created: Option<LoginCreated>,
}

#[derive(Deserialize)]
struct LoginCreated {
    #[serde(default)]
    token: Option<String>,
    // The firmware is not consistent about the userId type
    #[serde(rename = "userId", default)]
    user_id: Option<Value>,
}

/// Client for one router, holding at most one session token.
///
/// The router itself permits only a single concurrent session; this client
/// does not enforce that, it just holds whatever login produced.
pub struct RouterClient {
    http: Client,
    base_url: String,
    password: Option<String>,
    onepassword_item: String,
    token: Option<String>,
    user_id: Option<String>,
}

impl RouterClient {
    /// Create a client for the configured router.
    pub fn new(config: &RouterConfig) -> Result<Self> {
        let base_url = format!("http://{}:{}", config.host, config.port);
        Self::with_base_url(config, base_url)
    }

    /// Create a client with an explicit base URL (used by tests).
    pub fn with_base_url(config: &RouterConfig, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            password: config.password.clone(),
            onepassword_item: config.onepassword_item.clone(),
            token: None,
            user_id: None,
        })
    }

    fn rest_url(&self, endpoint: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, endpoint)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Authenticate with the router. On any failure no token is retained.
    pub async fn authenticate(&mut self) -> bool {
        let item = std::env::var(password::ONEPASSWORD_ITEM_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.onepassword_item.clone());

        let Some(pw) = resolve_password(self.password.as_deref(), &item) else {
            tracing::error!(
                "Could not retrieve router password from any source (config, {} env var, or 1Password)",
                password::PASSWORD_ENV
            );
            return false;
        };

        match self.login(&pw).await {
            Ok(created) => match created.token {
                Some(token) if !token.is_empty() => {
                    self.user_id = created.user_id.map(id_to_string);
                    self.token = Some(token);
                    tracing::info!("Authenticated with router REST API");
                    true
                }
                _ => {
                    tracing::error!("Login response contained no session token");
                    false
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "Router authentication failed");
                false
            }
        }
    }

    async fn login(&self, password: &str) -> Result<LoginCreated> {
        tracing::debug!(url = %self.rest_url("user/login"), "Sending login request");

        let response = self
            .http
            .post(self.rest_url("user/login"))
            .header("Connection", "keep-alive")
            .json(&serde_json::json!({ "password": password }))
            .send()
            .await
            .context("Failed to send login request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Login returned status {}", status);
        }

        let body: LoginResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;

        body.created
            .context("Login response missing 'created' object")
    }

    /// List all rules, normalized. Transport failure degrades to an empty
    /// list; callers cannot distinguish "no rules" from "request failed".
    pub async fn get_port_forwards(&self) -> Vec<RemoteRule> {
        match self.fetch_rules().await {
            Ok(rules) => rules,
            Err(e) => {
                tracing::error!(error = %e, "Failed to get port forwards");
                Vec::new()
            }
        }
    }

    async fn fetch_rules(&self) -> Result<Vec<RemoteRule>> {
        let token = self.require_token()?;

        let response = self
            .http
            .get(self.rest_url("network/portforwarding"))
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to request port forwarding rules")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Rule listing returned status {}", status);
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse rule listing")?;

        Ok(rules_from_envelope(&body)
            .iter()
            .map(RemoteRule::from_wire)
            .collect())
    }

    /// Add a rule; true iff the router accepted it.
    pub async fn add_port_forward(&self, rule: &PortForwardingRule) -> bool {
        match self.post_rule(rule).await {
            Ok(()) => {
                tracing::info!(name = %rule.name, external_port = rule.external_port, "Added port forward");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to add port forward");
                false
            }
        }
    }

    async fn post_rule(&self, rule: &PortForwardingRule) -> Result<()> {
        let token = self.require_token()?;
        let payload = rule.to_wire();

        let response = self
            .http
            .post(self.rest_url("network/portforwarding"))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .context("Failed to send add request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Add rule returned status {}", status);
        }

        Ok(())
    }

    /// Remove the rule matching an external port.
    ///
    /// Refetches the list first; zero matches or more than one match is a
    /// failure (see [`RemoveError`]) and no DELETE is issued.
    pub async fn remove_port_forward_by_port(&self, external_port: u16) -> bool {
        let rules = self.get_port_forwards().await;

        let matched = match find_rule_by_port(&rules, external_port) {
            Ok(rule) => rule,
            Err(e) => {
                tracing::error!(error = %e, "Cannot remove port forward");
                return false;
            }
        };

        match self.delete_rule(matched).await {
            Ok(()) => {
                tracing::info!(port = external_port, id = ?matched.id, "Removed port forward");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to remove port forward");
                false
            }
        }
    }

    async fn delete_rule(&self, rule: &RemoteRule) -> Result<()> {
        let token = self.require_token()?;

        // The DELETE body must echo the full rule in the router's native
        // shape, wrapped in the same envelope used for listing.
        let payload = RuleListEnvelope::single(rule.to_wire_entry());

        let response = self
            .http
            .delete(self.rest_url("network/portforwarding"))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .context("Failed to send delete request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Delete rule returned status {}", status);
        }

        Ok(())
    }

    /// URL for opening the router UI in a browser.
    ///
    /// The dialect's session hand-off token does not work in practice, so
    /// this is always the plain base URL; the user logs in manually.
    pub fn get_session_url(&self) -> String {
        self.base_url.clone()
    }

    /// Release the session slot. Local token state is always cleared and
    /// success is always reported; a failed logout is not actionable.
    pub async fn logout(&mut self) -> bool {
        let Some(token) = self.token.take() else {
            return true;
        };
        let user_id = self.user_id.take().unwrap_or_default();

        let url = self.rest_url(&format!("user/{}/token/{}", user_id, token));
        match self.http.delete(url).bearer_auth(&token).send().await {
            // Status deliberately not checked; the firmware returns various codes here
            Ok(_) => tracing::info!("Logged out from router"),
            Err(e) => tracing::warn!(error = %e, "Logout request failed, clearing session locally"),
        }

        true
    }

    fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .context("Not authenticated - call authenticate() first")
    }
}

fn id_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;

    fn remote(id: i64, external_port: u16) -> RemoteRule {
        RemoteRule {
            id: Some(id),
            name: format!("Rule {}", id),
            local_address: "192.168.178.10".to_string(),
            local_port: 80,
            external_port,
            protocol: "tcp".to_string(),
            enabled: true,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = RouterClient::new(&RouterConfig::default());
        assert!(client.is_ok());
        let client = client.unwrap();
        assert_eq!(client.base_url(), "http://192.168.178.1:80");
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_session_url_is_base_url() {
        let client = RouterClient::new(&RouterConfig::default()).unwrap();
        assert_eq!(client.get_session_url(), "http://192.168.178.1:80");
    }

    #[test]
    fn test_find_rule_no_match() {
        let rules = vec![remote(1, 8080)];
        assert_eq!(
            find_rule_by_port(&rules, 9999),
            Err(RemoveError::NotFound(9999))
        );
    }

    #[test]
    fn test_find_rule_single_match() {
        let rules = vec![remote(1, 8080), remote(2, 2222)];
        let found = find_rule_by_port(&rules, 2222).unwrap();
        assert_eq!(found.id, Some(2));
    }

    #[test]
    fn test_find_rule_ambiguous() {
        let rules = vec![remote(1, 8080), remote(2, 8080)];
        assert_eq!(
            find_rule_by_port(&rules, 8080),
            Err(RemoveError::Ambiguous {
                port: 8080,
                count: 2
            })
        );
    }

    #[tokio::test]
    async fn test_logout_without_token_succeeds() {
        let mut client = RouterClient::new(&RouterConfig::default()).unwrap();
        assert!(client.logout().await);
    }
}
