//! HTTP(S) transport carrying XML-RPC payloads.

use crate::error::{XenError, XenResult};
use crate::types::XenConfig;
use crate::xmlrpc;

use log::debug;
use serde_json::Value;
use std::time::Duration;

/// Sends one encoded request and returns the decoded response value.
///
/// [`XenClient`](crate::XenClient) talks to the server exclusively through
/// this trait, so the session logic can be driven by a scripted transport in
/// tests or routed over a custom stack.
pub trait Transport {
    fn send(&self, method: &str, params: &[Value]) -> XenResult<Value>;
}

/// XML-RPC over a blocking HTTP(S) POST.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Build a transport from connection configuration.
    pub fn new(config: &XenConfig) -> XenResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| XenError::connectivity(format!("Failed to build HTTP client: {e}")))?;

        let scheme = if config.use_tls { "https" } else { "http" };
        let endpoint = format!("{}://{}", scheme, config.hostname);

        Ok(Self { client, endpoint })
    }

    /// URL requests are POSTed to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn send(&self, method: &str, params: &[Value]) -> XenResult<Value> {
        let body = xmlrpc::encode_request(method, params)?;
        debug!("POST {} ({}, {} bytes)", self.endpoint, method, body.len());

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/xml")
            .body(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(XenError::connectivity(format!(
                "HTTP {} from {}",
                status.as_u16(),
                self.endpoint
            )));
        }

        let text = response.text()?;
        xmlrpc::decode_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_uses_https_by_default() {
        let config = XenConfig {
            hostname: "xen01.lab".into(),
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.endpoint(), "https://xen01.lab");
    }

    #[test]
    fn endpoint_uses_http_when_tls_disabled() {
        let config = XenConfig {
            hostname: "xen01.lab".into(),
            use_tls: false,
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.endpoint(), "http://xen01.lab");
    }
}
