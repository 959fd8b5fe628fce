//! Connection configuration for the XenAPI client.

use serde::{Deserialize, Serialize};

/// Configuration for connecting to a XenServer / XCP-ng host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XenConfig {
    /// Hostname / IP of the server, without scheme (e.g. "xenserver.lab.local")
    pub hostname: String,
    /// Username (e.g. "root")
    pub username: String,
    /// Password
    pub password: String,
    /// Client API version sent with the login call
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Use HTTPS (true) or plain HTTP (false)
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    /// Verify the server TLS certificate. Off by default: XenServer hosts
    /// ship self-signed certificates.
    #[serde(default)]
    pub verify_tls: bool,
    /// Connection-establishment timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_version() -> String {
    "1.3".to_string()
}

fn default_use_tls() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_timeout() -> u64 {
    60
}

impl Default for XenConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            username: String::new(),
            password: String::new(),
            api_version: default_api_version(),
            use_tls: true,
            verify_tls: false,
            connect_timeout_secs: 5,
            timeout_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = XenConfig::default();
        assert_eq!(config.api_version, "1.3");
        assert!(config.use_tls);
        assert!(!config.verify_tls);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn deserialize_minimal() {
        let config: XenConfig = serde_json::from_str(
            r#"{"hostname":"xen01.lab","username":"root","password":"secret"}"#,
        )
        .unwrap();
        assert_eq!(config.hostname, "xen01.lab");
        assert_eq!(config.api_version, "1.3");
        assert!(config.use_tls);
        assert!(!config.verify_tls);
    }

    #[test]
    fn deserialize_overrides() {
        let config: XenConfig = serde_json::from_str(
            r#"{"hostname":"xen01.lab","username":"root","password":"secret",
                "apiVersion":"2.3","useTls":false,"verifyTls":true,"timeoutSecs":10}"#,
        )
        .unwrap();
        assert_eq!(config.api_version, "2.3");
        assert!(!config.use_tls);
        assert!(config.verify_tls);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.connect_timeout_secs, 5);
    }
}
