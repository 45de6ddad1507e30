// Command handlers for the CLI
//
// Each handler prints its own output (human or --json) and returns whether
// the operation succeeded; main turns that into the exit code.

use serde_json::json;
use std::process::{Command, Stdio};

use super::output::{
    finish_spinner, log_error, log_info, log_success, log_warning, render_rules_table, spinner,
};
use crate::config::Config;
use crate::errors;
use crate::router::client::find_rule_by_port;
use crate::router::password::{self, resolve_password};
use crate::router::{
    expand_ip_shorthand, validate_port, PortForwardingRule, Protocol, RemoveError, RouterClient,
};

fn emit_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => tracing::error!(error = %e, "Failed to encode JSON output"),
    }
}

fn fail(json: bool, message: &str) -> bool {
    if json {
        emit_json(&json!({"status": "error", "message": message}));
    } else {
        log_error(message);
    }
    false
}

/// Construct and authenticate a client, reporting failures to the user.
async fn authenticated_client(
    config: &Config,
    json: bool,
    spinner_message: &str,
) -> Option<RouterClient> {
    let mut client = match RouterClient::new(&config.router) {
        Ok(client) => client,
        Err(e) => {
            fail(json, &format!("Failed to create router client: {:#}", e));
            return None;
        }
    };

    let sp = spinner(spinner_message, json);
    let authenticated = client.authenticate().await;
    finish_spinner(sp);

    if !authenticated {
        if json {
            emit_json(&json!({"status": "error", "message": "Failed to authenticate with router"}));
        } else {
            log_error("Failed to authenticate with router");
            let item = std::env::var(password::ONEPASSWORD_ITEM_ENV)
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| config.router.onepassword_item.clone());
            // Distinguish "no password anywhere" from a rejected login
            if resolve_password(config.router.password.as_deref(), &item).is_none() {
                eprintln!("\n{}", errors::password_missing_error());
            } else {
                eprintln!("\n{}", errors::auth_failed_error(&config.router.host));
            }
        }
        return None;
    }

    Some(client)
}

/// `sagectl open` - create a port forwarding rule
pub async fn run_open(
    config: &Config,
    json: bool,
    name: &str,
    local_address: &str,
    local_port: i64,
    external_port: i64,
    protocol: Protocol,
) -> bool {
    if !validate_port(local_port) || !validate_port(external_port) {
        return fail(json, "Invalid port number(s)");
    }

    let local_address = expand_ip_shorthand(local_address);

    let Some(mut client) = authenticated_client(config, json, "Authenticating with router...").await
    else {
        return false;
    };

    let rule = PortForwardingRule::new(
        name,
        &local_address,
        local_port as u16,
        external_port as u16,
        protocol,
    );

    let sp = spinner(&format!("Creating port forward: {}...", name), json);
    let added = client.add_port_forward(&rule).await;
    finish_spinner(sp);
    client.logout().await;

    if !added {
        return fail(json, "Failed to create port forward");
    }

    if json {
        emit_json(&json!({
            "status": "success",
            "message": "Port forward created successfully",
            "rule": {
                "name": rule.name,
                "local_address": rule.local_address,
                "local_port": rule.local_port,
                "external_port": rule.external_port,
                "protocol": rule.protocol.to_string(),
            }
        }));
    } else {
        log_success("Port forward created successfully");
        println!("Rule: {}", name);
        println!("External Port: {}", external_port);
        println!("Internal: {}:{}", local_address, local_port);
        println!("Protocol: {}", protocol.to_string().to_uppercase());
    }
    true
}

/// `sagectl close` - remove the rule matching an external port
pub async fn run_close(config: &Config, json: bool, port: i64) -> bool {
    if !validate_port(port) {
        return fail(json, "Invalid port number");
    }
    let port = port as u16;

    let Some(mut client) = authenticated_client(config, json, "Authenticating with router...").await
    else {
        return false;
    };

    let sp = spinner(
        &format!("Removing port forward for external port: {}...", port),
        json,
    );
    let rules = client.get_port_forwards().await;
    let lookup = find_rule_by_port(&rules, port).map(|_| ());
    let removed = if lookup.is_ok() {
        client.remove_port_forward_by_port(port).await
    } else {
        false
    };
    finish_spinner(sp);
    client.logout().await;

    match lookup {
        Err(RemoveError::NotFound(port)) => fail(
            json,
            &format!("No port forward rule found for external port {}", port),
        ),
        Err(RemoveError::Ambiguous { port, count }) => {
            if json {
                emit_json(&json!({
                    "status": "error",
                    "message": format!("{} rules share external port {}, refusing to guess", count, port)
                }));
            } else {
                log_error(&format!("Multiple rules found for port {}", port));
                eprintln!("\n{}", errors::ambiguous_rule_error(port, count));
            }
            false
        }
        Ok(()) if removed => {
            let message = format!("Port forward for port {} removed successfully", port);
            if json {
                emit_json(&json!({"status": "success", "message": message}));
            } else {
                log_success(&message);
            }
            true
        }
        Ok(()) => fail(json, "Failed to remove port forward"),
    }
}

/// `sagectl list` - show all rules
pub async fn run_list(config: &Config, json: bool) -> bool {
    let Some(mut client) = authenticated_client(config, json, "Authenticating with router...").await
    else {
        return false;
    };

    let sp = spinner("Retrieving port forwards...", json);
    let rules = client.get_port_forwards().await;
    finish_spinner(sp);
    client.logout().await;

    if json {
        emit_json(&rules);
        return true;
    }

    if rules.is_empty() {
        log_warning("No port forwarding rules found");
        return true;
    }

    log_info("Current Port Forwarding Rules:");
    println!("{}", render_rules_table(&rules));
    true
}

/// `sagectl browser` - verify connectivity, free the session slot, open the UI
pub async fn run_browser(config: &Config, json: bool) -> bool {
    let Some(mut client) =
        authenticated_client(config, json, "Verifying router connection...").await
    else {
        return false;
    };

    // Logout to free up the single session slot for the browser login
    let sp = spinner("Freeing session slot for browser login...", json);
    client.logout().await;
    finish_spinner(sp);

    let session_url = client.get_session_url();

    if json {
        emit_json(&json!({
            "status": "success",
            "message": "Session URL retrieved.",
            "url": session_url
        }));
        return true;
    }

    log_info("Opening router web interface...");

    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    let opened = Command::new(opener)
        .arg(&session_url)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);

    if opened {
        log_success("Router web interface opened in browser");
        println!("URL: {}", session_url);
        log_info("Please login with your router password");
        log_warning("Note: Only one session is allowed at a time");
        true
    } else {
        log_error("Unable to open browser automatically");
        println!("Please open this URL manually: {}", session_url);
        false
    }
}
