// # OPNsense Alias Client
//
// This crate provides an OPNsense implementation of the AliasClient trait.
//
// ## Behaviour
//
// - One HTTP request per trait call, no retries (the scheduler owns retrying)
// - Every failure surfaces as `Error::Remote` naming the operation
// - HTTP timeout configured (30 seconds unless configured otherwise)
// - Dry-run mode: reads go through, writes are only logged
// - Optional TLS verification for self-signed firewall certificates
//
// ## Security Requirements
//
// - API secret NEVER appears in logs or Debug output
// - Construction fails fast on empty credentials
//
// ## API Reference
//
// All calls are under `<host>/api/` with HTTP basic auth (key, secret):
//
// - Alias UUID:   GET  `firewall/alias/getAliasUUID/:name`
// - Alias rows:   GET  `firewall/alias_util/list/:name`
// - Set alias:    POST `firewall/alias/setItem/:uuid`
// - Apply:        POST `firewall/alias/reconfigure`
// - Health:       GET  `core/firmware/status`

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};
use v6alias_core::config::FirewallConfig;
use v6alias_core::traits::AliasClient;
use v6alias_core::{Error, Result};

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PATH_ALIAS_UUID: &str = "firewall/alias/getAliasUUID";
const PATH_ALIAS_LIST: &str = "firewall/alias_util/list";
const PATH_ALIAS_SET: &str = "firewall/alias/setItem";
const PATH_ALIAS_RECONFIGURE: &str = "firewall/alias/reconfigure";
const PATH_FIRMWARE_STATUS: &str = "core/firmware/status";

/// OPNsense alias client
///
/// Stateless apart from the HTTP connection pool. All coordination
/// (when to write, retrying) is owned by the reconciler and scheduler.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the client will:
/// - Perform all GET requests (alias lookup, alias rows, health)
/// - Log the intended setItem payload and the reconfigure call
/// - **NOT** actually modify or apply the alias
pub struct OpnsenseClient {
    /// Base URL without trailing slash
    base_url: String,

    /// API key (basic auth user)
    api_key: String,

    /// API secret (basic auth password)
    /// ⚠️ NEVER log this value
    api_secret: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip POST updates
    dry_run: bool,
}

// Custom Debug implementation that hides the API secret
impl std::fmt::Debug for OpnsenseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpnsenseClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<REDACTED>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl OpnsenseClient {
    /// Create a new OPNsense client
    ///
    /// # Parameters
    ///
    /// - `host`: API base URL, e.g. `https://192.168.1.1`
    /// - `api_key` / `api_secret`: API key pair of an OPNsense user
    /// - `ssl_verify`: If false, invalid TLS certificates are accepted
    /// - `timeout`: Per-request timeout
    /// - `dry_run`: If true, perform reads but skip writes
    pub fn new(
        host: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        ssl_verify: bool,
        timeout: Duration,
        dry_run: bool,
    ) -> Result<Self> {
        let host = host.into();
        let api_key = api_key.into();
        let api_secret = api_secret.into();

        if host.is_empty() {
            return Err(Error::config("OPNsense host cannot be empty"));
        }
        if api_key.is_empty() || api_secret.is_empty() {
            return Err(Error::config("OPNsense API key and secret are required"));
        }

        if !ssl_verify {
            warn!("TLS certificate verification is disabled for {}", host);
        }
        if dry_run {
            warn!("OPNsense client running in DRY-RUN mode - the alias will not be changed");
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!ssl_verify)
            .build()
            .map_err(|e| Error::remote("client_setup", format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: host.trim_end_matches('/').to_string(),
            api_key,
            api_secret,
            client,
            dry_run,
        })
    }

    /// Create a client from the `[firewall]` configuration section
    pub fn from_config(config: &FirewallConfig) -> Result<Self> {
        Self::new(
            config.host.clone(),
            config.api_key.clone(),
            config.api_secret.clone(),
            config.ssl_verify,
            config.timeout(),
            config.dry_run,
        )
    }

    /// Create a client with default TLS verification and timeout
    pub fn with_defaults(
        host: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Result<Self> {
        Self::new(host, api_key, api_secret, true, DEFAULT_HTTP_TIMEOUT, false)
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Build `<base>/api/<path>[/<param>...]`
    fn url(&self, path: &str, params: &[&str]) -> String {
        let mut url = format!("{}/api/{}", self.base_url, path);
        for param in params {
            url.push('/');
            url.push_str(param);
        }
        url
    }

    async fn get_json(&self, operation: &str, url: &str) -> Result<Value> {
        debug!(operation, "GET {}", url);
        let response = self
            .client
            .get(url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        read_json(operation, response).await
    }

    async fn post_json(&self, operation: &str, url: &str, body: &Value) -> Result<Value> {
        debug!(operation, "POST {}", url);
        let response = self
            .client
            .post(url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        read_json(operation, response).await
    }
}

/// Request body for `setItem`: a network alias holding `entries`
pub fn alias_body(name: &str, entries: &[String]) -> Value {
    json!({
        "alias": {
            "enabled": "1",
            "name": name,
            "type": "network",
            "content": entries.join("\n"),
        }
    })
}

fn transport_error(operation: &str, error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::remote(operation, format!("request timed out: {}", error))
    } else {
        Error::remote(operation, format!("HTTP request failed: {}", error))
    }
}

/// Check the status, then parse the body as JSON
async fn read_json(operation: &str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        let message = match status.as_u16() {
            401 | 403 => format!(
                "Authentication failed: invalid API key/secret or insufficient privileges. Status: {}",
                status
            ),
            404 => format!("Endpoint or object not found. Status: {}", status),
            429 => format!("Rate limit exceeded. Status: {}", status),
            500..=599 => format!("OPNsense server error: {} - {}", status, error_text),
            _ => format!("Unexpected response: {} - {}", status, error_text),
        };
        return Err(Error::remote(operation, message));
    }

    response
        .json()
        .await
        .map_err(|e| Error::remote(operation, format!("Failed to parse response: {}", e)))
}

#[async_trait]
impl AliasClient for OpnsenseClient {
    /// ```http
    /// GET /api/firewall/alias/getAliasUUID/:name
    /// → {"uuid": "..."}   (or [] when the alias does not exist)
    /// ```
    async fn resolve_alias_id(&self, name: &str) -> Result<String> {
        let operation = "resolve_alias_id";
        let json = self.get_json(operation, &self.url(PATH_ALIAS_UUID, &[name])).await?;

        json.get("uuid")
            .and_then(Value::as_str)
            .filter(|uuid| !uuid.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::remote(operation, format!("alias not found: {}", name)))
    }

    /// ```http
    /// GET /api/firewall/alias_util/list/:name
    /// → {"rows": [{"ip": "..."}, ...]}
    /// ```
    async fn list_alias_entries(&self, name: &str) -> Result<Vec<String>> {
        let operation = "list_alias_entries";
        let json = self.get_json(operation, &self.url(PATH_ALIAS_LIST, &[name])).await?;

        let rows = json["rows"].as_array().ok_or_else(|| {
            Error::remote(operation, "Invalid response format: rows is not an array")
        })?;

        rows.iter()
            .map(|row| {
                row["ip"].as_str().map(str::to_string).ok_or_else(|| {
                    Error::remote(operation, "Invalid response format: row.ip is not a string")
                })
            })
            .collect()
    }

    /// ```http
    /// POST /api/firewall/alias/setItem/:uuid
    /// {"alias": {"enabled": "1", "name": ..., "type": "network", "content": "a\nb"}}
    /// → {"result": "saved"}
    /// ```
    async fn replace_alias_entries(&self, id: &str, name: &str, entries: &[String]) -> Result<()> {
        let operation = "replace_alias_entries";
        let url = self.url(PATH_ALIAS_SET, &[id]);
        let body = alias_body(name, entries);

        if self.dry_run {
            info!("[DRY-RUN] Would send POST request to {} with payload: {}", url, body);
            return Ok(());
        }

        let json = self.post_json(operation, &url, &body).await?;

        if json.get("result").and_then(Value::as_str) == Some("failed") {
            let validations = json
                .get("validations")
                .map(Value::to_string)
                .unwrap_or_else(|| "no details".to_string());
            return Err(Error::remote(
                operation,
                format!("OPNsense rejected the alias: {}", validations),
            ));
        }

        debug!(alias = name, entries = entries.len(), "Alias content staged");
        Ok(())
    }

    /// ```http
    /// POST /api/firewall/alias/reconfigure
    /// → {"status": "ok"}
    /// ```
    async fn commit(&self) -> Result<()> {
        let operation = "commit";
        let url = self.url(PATH_ALIAS_RECONFIGURE, &[]);

        if self.dry_run {
            info!("[DRY-RUN] Would send POST request to {}", url);
            return Ok(());
        }

        let json = self.post_json(operation, &url, &json!({})).await?;

        if let Some(status) = json.get("status").and_then(Value::as_str)
            && !status.trim().eq_ignore_ascii_case("ok")
        {
            return Err(Error::remote(
                operation,
                format!("reconfigure returned status '{}'", status.trim()),
            ));
        }

        debug!("Alias configuration applied");
        Ok(())
    }

    /// ```http
    /// GET /api/core/firmware/status
    /// ```
    async fn health_check(&self) -> Result<()> {
        self.get_json("health_check", &self.url(PATH_FIRMWARE_STATUS, &[]))
            .await
            .map(|_| ())
    }

    fn client_name(&self) -> &'static str {
        "opnsense"
    }
}
