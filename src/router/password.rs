// Router password resolution
//
// Priority order: explicit configured value, SAGEMCOM_MODEM_PASSWORD
// environment variable, 1Password CLI lookup by item name.

use std::process::Command;

pub const PASSWORD_ENV: &str = "SAGEMCOM_MODEM_PASSWORD";
pub const ONEPASSWORD_ITEM_ENV: &str = "SAGEMCOM_ONEPASSWORD_ITEM";
pub const DEFAULT_ONEPASSWORD_ITEM: &str = "Ziggo";

/// Resolve the router password from the available sources.
pub fn resolve_password(explicit: Option<&str>, item_name: &str) -> Option<String> {
    if let Some(password) = explicit {
        if !password.is_empty() {
            return Some(password.to_string());
        }
    }

    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        if !password.is_empty() {
            return Some(password);
        }
    }

    password_from_1password(item_name)
}

/// Look up the password via the 1Password CLI.
///
/// `op item get <item> --fields password --format json` prints
/// `{"value": "..."}` for a single field.
fn password_from_1password(item_name: &str) -> Option<String> {
    let output = match Command::new("op")
        .args(["item", "get", item_name, "--fields", "password", "--format", "json"])
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(error = %e, "Failed to run 1Password CLI (is 'op' installed?)");
            return None;
        }
    };

    if !output.status.success() {
        tracing::error!(
            item = item_name,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "1Password CLI lookup failed"
        );
        return None;
    }

    let field: serde_json::Value = match serde_json::from_slice(&output.stdout) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse 1Password CLI output");
            return None;
        }
    };

    field
        .get("value")
        .and_then(|v| v.as_str())
        .map(String::from)
}
