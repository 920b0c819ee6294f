//! # SMS Gateway
//!
//! Fast2SMS client. Without an API key the gateway runs in demo mode:
//! nothing leaves the process and every dispatch reports success.

use schoolhub_core::sms::GatewayOutcome;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://www.fast2sms.com";

/// Placeholder key shipped in sample configs. Treated as no key.
const PLACEHOLDER_KEY: &str = "YOUR_API_KEY_HERE";

const SEND_TIMEOUT: Duration = Duration::from_secs(15);
const BALANCE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SmsGateway {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl SmsGateway {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != PLACEHOLDER_KEY);
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send one message to many numbers in a single bulk request.
    ///
    /// Success means HTTP 200 and a body with `"return": true`. Transport
    /// failures become a failed outcome carrying the error text.
    pub async fn send(&self, numbers: &[&str], message: &str) -> GatewayOutcome {
        let Some(key) = &self.api_key else {
            return GatewayOutcome::demo();
        };
        let joined = numbers.join(",");
        let request = self
            .client
            .get(format!("{}/dev/bulkV2", self.base_url))
            .query(&[
                ("authorization", key.as_str()),
                ("route", "q"),
                ("message", message),
                ("language", "english"),
                ("flash", "0"),
                ("numbers", joined.as_str()),
            ])
            .header("cache-control", "no-cache")
            .timeout(SEND_TIMEOUT);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "SMS gateway unreachable");
                return GatewayOutcome {
                    success: false,
                    api_response: format!("Error: {e}"),
                    demo_mode: false,
                };
            }
        };
        let ok_status = response.status() == reqwest::StatusCode::OK;
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "SMS gateway response unreadable");
                return GatewayOutcome {
                    success: false,
                    api_response: format!("Error: {e}"),
                    demo_mode: false,
                };
            }
        };
        let accepted = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("return").and_then(Value::as_bool))
            == Some(true);
        if !(ok_status && accepted) {
            warn!(response = %body, "SMS gateway rejected the request");
        }
        GatewayOutcome {
            success: ok_status && accepted,
            api_response: body,
            demo_mode: false,
        }
    }

    /// Wallet balance as `{success, data}` or `{success: false, error}`.
    pub async fn balance(&self) -> Value {
        let Some(key) = &self.api_key else {
            return json!({"success": false, "error": "API key not configured"});
        };
        let result = self
            .client
            .get(format!("{}/dev/wallet", self.base_url))
            .query(&[("authorization", key.as_str())])
            .timeout(BALANCE_TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        let body = match result {
            Ok(response) => response.text().await,
            Err(e) => Err(e),
        };
        match body {
            Ok(data) => json!({"success": true, "data": data}),
            Err(e) => {
                warn!(error = %e, "SMS balance check failed");
                json!({"success": false, "error": e.to_string()})
            }
        }
    }
}
