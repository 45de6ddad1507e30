// User-friendly error messages
//
// Helpers that turn failures into actionable text for the CLI.

/// Format an authentication failure with helpful suggestions.
pub fn auth_failed_error(host: &str) -> String {
    format!(
        "Failed to authenticate with router at {}\n\n\
        \x1b[1;33mPossible causes:\x1b[0m\n\
        • Wrong password\n\
        • Router unreachable on the LAN\n\
        • Another session is still active (the router allows only one)\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check the router is reachable:\n\
           \x1b[36mping {}\x1b[0m\n\n\
        2. Free the session slot by logging out of the web UI,\n\
           or wait a few minutes for the router-side timeout\n\n\
        3. Verify the password source:\n\
           \x1b[36mexport SAGEMCOM_MODEM_PASSWORD=...\x1b[0m",
        host, host
    )
}

/// Format a missing-password failure.
pub fn password_missing_error() -> String {
    "Could not retrieve the router password from any source\n\n\
    \x1b[1;33mSources checked, in order:\x1b[0m\n\
    • password in ~/.sagectl/config.toml\n\
    • SAGEMCOM_MODEM_PASSWORD environment variable\n\
    • 1Password CLI item (SAGEMCOM_ONEPASSWORD_ITEM, default 'Ziggo')\n\n\
    \x1b[1;32mTry:\x1b[0m\n\
    \x1b[36mexport SAGEMCOM_MODEM_PASSWORD=\"...\"\x1b[0m"
        .to_string()
}

/// Format the ambiguous delete-by-port refusal.
pub fn ambiguous_rule_error(port: u16, count: usize) -> String {
    format!(
        "{} rules share external port {}\n\n\
        The router's API has no unique secondary key, so sagectl refuses\n\
        to guess which rule to delete. Remove the duplicates in the web UI:\n\
        \x1b[36msagectl browser\x1b[0m",
        count, port
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failed_mentions_host() {
        let msg = auth_failed_error("192.168.178.1");
        assert!(msg.contains("ping 192.168.178.1"));
        assert!(msg.contains("one"));
    }

    #[test]
    fn test_password_missing_lists_sources() {
        let msg = password_missing_error();
        assert!(msg.contains("SAGEMCOM_MODEM_PASSWORD"));
        assert!(msg.contains("1Password"));
    }

    #[test]
    fn test_ambiguous_mentions_count_and_port() {
        let msg = ambiguous_rule_error(8080, 2);
        assert!(msg.contains("2 rules"));
        assert!(msg.contains("8080"));
        assert!(msg.contains("sagectl browser"));
    }
}
