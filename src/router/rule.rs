// Port forwarding rule model and wire normalization
//
// The router's REST dialect models single ports as ranges of length one and
// joins tcp/udp with '_' on the wire. The normalized view uses '/'.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Protocol for a port forwarding rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
    #[value(name = "tcp_udp")]
    TcpUdp,
}

impl Protocol {
    /// Wire form used by the router ('_' separator, lower case)
    pub fn wire(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::TcpUdp => "tcp_udp",
        }
    }

    /// Parse from either the wire form or the normalized display form
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tcp" => Some(Protocol::Tcp),
            "udp" => Some(Protocol::Udp),
            "tcp_udp" | "tcp/udp" => Some(Protocol::TcpUdp),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::TcpUdp => "tcp/udp",
        };
        write!(f, "{}", s)
    }
}

/// A port forwarding rule as the user describes it
///
/// The name is display-only; this dialect has no rule names on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct PortForwardingRule {
    pub name: String,
    pub local_address: String,
    pub local_port: u16,
    pub external_port: u16,
    pub protocol: Protocol,
    pub enabled: bool,
}

impl PortForwardingRule {
    pub fn new(
        name: impl Into<String>,
        local_address: impl Into<String>,
        local_port: u16,
        external_port: u16,
        protocol: Protocol,
    ) -> Self {
        Self {
            name: name.into(),
            local_address: local_address.into(),
            local_port,
            external_port,
            protocol,
            enabled: true,
        }
    }

    /// Serialize to the router's add payload: `{"rule": {...}}`
    pub fn to_wire(&self) -> AddRulePayload {
        AddRulePayload {
            rule: WireRule {
                local_address: self.local_address.clone(),
                local_start_port: self.local_port,
                local_end_port: self.local_port,
                external_start_port: self.external_port,
                external_end_port: self.external_port,
                protocol: self.protocol.wire().to_string(),
                enable: self.enabled,
                read_only: None,
            },
        }
    }
}

/// Rule body in the router's native shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRule {
    #[serde(rename = "localAddress", default)]
    pub local_address: String,
    #[serde(rename = "localStartPort", default)]
    pub local_start_port: u16,
    #[serde(rename = "localEndPort", default)]
    pub local_end_port: u16,
    #[serde(rename = "externalStartPort", default)]
    pub external_start_port: u16,
    #[serde(rename = "externalEndPort", default)]
    pub external_end_port: u16,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub enable: bool,
    #[serde(rename = "readOnly", default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

/// One entry of the router's rule collection: an id plus the rule body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRuleEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub rule: WireRule,
}

/// POST body for adding a rule
#[derive(Debug, Serialize)]
pub struct AddRulePayload {
    pub rule: WireRule,
}

/// List envelope, also used as the DELETE body
#[derive(Debug, Serialize)]
pub struct RuleListEnvelope {
    pub portforwarding: RuleList,
}

#[derive(Debug, Serialize)]
pub struct RuleList {
    pub rules: Vec<WireRuleEntry>,
}

impl RuleListEnvelope {
    pub fn single(entry: WireRuleEntry) -> Self {
        Self {
            portforwarding: RuleList {
                rules: vec![entry],
            },
        }
    }
}

/// Unwrap the `{portforwarding: {rules: [...]}}` envelope from a GET response.
///
/// Falls back to treating `portforwarding` as a bare list when the nested
/// `rules` key is absent. Entries without a `rule` object are skipped.
pub fn rules_from_envelope(body: &Value) -> Vec<WireRuleEntry> {
    let items = match body.get("portforwarding") {
        Some(Value::Object(map)) => map
            .get("rules")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<WireRuleEntry>(item).ok())
        .collect()
}

/// A rule as reported by the router, in normalized form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRule {
    pub id: Option<i64>,
    pub name: String,
    pub local_address: String,
    pub local_port: u16,
    pub external_port: u16,
    /// Protocol string with the wire '_' replaced by '/'
    pub protocol: String,
    pub enabled: bool,
}

impl RemoteRule {
    pub fn from_wire(entry: &WireRuleEntry) -> Self {
        // This dialect has no rule names; fabricate one from the id
        let name = match entry.id {
            Some(id) => format!("Rule {}", id),
            None => "Rule unknown".to_string(),
        };

        Self {
            id: entry.id,
            name,
            local_address: entry.rule.local_address.clone(),
            local_port: entry.rule.local_start_port,
            external_port: entry.rule.external_start_port,
            protocol: entry.rule.protocol.replace('_', "/"),
            enabled: entry.rule.enable,
        }
    }

    /// Reconstruct the router's native shape. The DELETE endpoint requires
    /// the full original rule body, not just the id.
    pub fn to_wire_entry(&self) -> WireRuleEntry {
        WireRuleEntry {
            id: self.id,
            rule: WireRule {
                local_address: self.local_address.clone(),
                local_start_port: self.local_port,
                local_end_port: self.local_port,
                external_start_port: self.external_port,
                external_end_port: self.external_port,
                protocol: self.protocol.replace('/', "_"),
                enable: self.enabled,
                read_only: Some(false),
            },
        }
    }
}

/// Port numbers must fit the router's 1..=65535 range
pub fn validate_port(port: i64) -> bool {
    (1..=65535).contains(&port)
}

/// Expand IP shorthand: "100" becomes "192.168.178.100".
/// Anything that is not a bare host number in 1..=254 passes through.
pub fn expand_ip_shorthand(ip: &str) -> String {
    if !ip.is_empty() && ip.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = ip.parse::<u32>() {
            if (1..=254).contains(&n) {
                return format!("192.168.178.{}", ip);
            }
        }
    }
    ip.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_port_range() {
        assert!(validate_port(1));
        assert!(validate_port(80));
        assert!(validate_port(65535));
        assert!(!validate_port(0));
        assert!(!validate_port(65536));
        assert!(!validate_port(-1));
    }

    #[test]
    fn test_expand_ip_shorthand() {
        assert_eq!(expand_ip_shorthand("100"), "192.168.178.100");
        assert_eq!(expand_ip_shorthand("192.168.1.50"), "192.168.1.50");
        assert_eq!(expand_ip_shorthand("invalid"), "invalid");
        assert_eq!(expand_ip_shorthand("256"), "256");
        assert_eq!(expand_ip_shorthand("0"), "0");
        assert_eq!(expand_ip_shorthand(""), "");
    }

    #[test]
    fn test_protocol_parse() {
        assert_eq!(Protocol::parse("tcp"), Some(Protocol::Tcp));
        assert_eq!(Protocol::parse("UDP"), Some(Protocol::Udp));
        assert_eq!(Protocol::parse("tcp_udp"), Some(Protocol::TcpUdp));
        assert_eq!(Protocol::parse("tcp/udp"), Some(Protocol::TcpUdp));
        assert_eq!(Protocol::parse("sctp"), None);
    }

    #[test]
    fn test_protocol_forms() {
        assert_eq!(Protocol::TcpUdp.wire(), "tcp_udp");
        assert_eq!(Protocol::TcpUdp.to_string(), "tcp/udp");
        assert_eq!(Protocol::Tcp.wire(), "tcp");
        assert_eq!(Protocol::Tcp.to_string(), "tcp");
    }

    #[test]
    fn test_add_payload_duplicates_ports() {
        let rule = PortForwardingRule::new("Web", "192.168.178.10", 80, 8080, Protocol::Tcp);
        let payload = serde_json::to_value(rule.to_wire()).unwrap();

        assert_eq!(payload["rule"]["localAddress"], "192.168.178.10");
        assert_eq!(payload["rule"]["localStartPort"], 80);
        assert_eq!(payload["rule"]["localEndPort"], 80);
        assert_eq!(payload["rule"]["externalStartPort"], 8080);
        assert_eq!(payload["rule"]["externalEndPort"], 8080);
        assert_eq!(payload["rule"]["protocol"], "tcp");
        assert_eq!(payload["rule"]["enable"], true);
        // readOnly is only sent on delete
        assert!(payload["rule"].get("readOnly").is_none());
    }

    #[test]
    fn test_envelope_normalization() {
        let body = json!({
            "portforwarding": {
                "rules": [
                    {"id": 1, "rule": {"localAddress": "192.168.178.10", "localStartPort": 80,
                        "externalStartPort": 8080, "protocol": "tcp", "enable": true}},
                    {"id": 2, "rule": {"localAddress": "192.168.178.11", "localStartPort": 22,
                        "externalStartPort": 2222, "protocol": "tcp_udp", "enable": false}}
                ]
            }
        });

        let rules: Vec<RemoteRule> = rules_from_envelope(&body)
            .iter()
            .map(RemoteRule::from_wire)
            .collect();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, "Rule 1");
        assert_eq!(rules[0].external_port, 8080);
        assert_eq!(rules[0].protocol, "tcp");
        assert!(rules[0].enabled);
        assert_eq!(rules[1].protocol, "tcp/udp");
        assert!(!rules[1].enabled);
    }

    #[test]
    fn test_envelope_bare_list_fallback() {
        let body = json!({
            "portforwarding": [
                {"id": 7, "rule": {"localAddress": "192.168.178.5", "localStartPort": 443,
                    "externalStartPort": 443, "protocol": "tcp", "enable": true}}
            ]
        });

        let rules = rules_from_envelope(&body);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, Some(7));
    }

    #[test]
    fn test_envelope_skips_entries_without_rule() {
        let body = json!({
            "portforwarding": {
                "rules": [
                    {"id": 1},
                    {"id": 2, "rule": {"localAddress": "192.168.178.9", "localStartPort": 80,
                        "externalStartPort": 80, "protocol": "udp", "enable": true}}
                ]
            }
        });

        let rules = rules_from_envelope(&body);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, Some(2));
    }

    #[test]
    fn test_envelope_missing_key() {
        assert!(rules_from_envelope(&json!({})).is_empty());
        assert!(rules_from_envelope(&json!({"portforwarding": null})).is_empty());
    }

    #[test]
    fn test_wire_round_trip() {
        let rule = PortForwardingRule::new("Game", "192.168.178.50", 25565, 25565, Protocol::TcpUdp);
        let payload = rule.to_wire();

        // Feed the add payload back through the list-normalization path
        let body = json!({
            "portforwarding": {
                "rules": [{"id": 3, "rule": serde_json::to_value(&payload.rule).unwrap()}]
            }
        });
        let normalized: Vec<RemoteRule> = rules_from_envelope(&body)
            .iter()
            .map(RemoteRule::from_wire)
            .collect();

        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].local_port, rule.local_port);
        assert_eq!(normalized[0].external_port, rule.external_port);
        assert_eq!(normalized[0].protocol, "tcp/udp");
        assert_eq!(normalized[0].enabled, rule.enabled);
    }

    #[test]
    fn test_delete_entry_mirrors_normalized_fields() {
        let remote = RemoteRule {
            id: Some(4),
            name: "Rule 4".to_string(),
            local_address: "192.168.178.20".to_string(),
            local_port: 8096,
            external_port: 8096,
            protocol: "tcp/udp".to_string(),
            enabled: true,
        };

        let entry = remote.to_wire_entry();
        assert_eq!(entry.id, Some(4));
        assert_eq!(entry.rule.protocol, "tcp_udp");
        assert_eq!(entry.rule.local_start_port, 8096);
        assert_eq!(entry.rule.local_end_port, 8096);
        assert_eq!(entry.rule.external_start_port, 8096);
        assert_eq!(entry.rule.external_end_port, 8096);
        assert_eq!(entry.rule.read_only, Some(false));

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["rule"]["readOnly"], false);
    }
}
