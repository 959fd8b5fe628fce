//! Session-owning XenAPI client: login, call relay, invalid-session
//! recovery, logout on teardown.

use crate::error::{XenError, XenResult};
use crate::transport::{HttpTransport, Transport};
use crate::types::XenConfig;

use log::{debug, info, warn};
use serde_json::Value;
use std::fmt;

/// XenAPI client holding an authenticated session.
///
/// Constructed with [`XenClient::connect`], which logs in immediately; a
/// client is never observable without a valid session. Every [`call`]
/// prepends the session token to the argument list. When the server reports
/// `SESSION_INVALID` the client re-authenticates and retries in place, at
/// most [`MAX_INVALID_SESSIONS`] recoveries over the client's lifetime.
///
/// The held session is released with `session.logout` when the client is
/// dropped, or earlier via [`logout`].
///
/// [`call`]: XenClient::call
/// [`logout`]: XenClient::logout
/// [`MAX_INVALID_SESSIONS`]: XenClient::MAX_INVALID_SESSIONS
pub struct XenClient {
    transport: Box<dyn Transport>,
    config: XenConfig,
    session: Option<String>,
    invalid_sessions: u32,
}

impl XenClient {
    /// Invalid-session recoveries allowed per client lifetime.
    pub const MAX_INVALID_SESSIONS: u32 = 3;

    /// Connect over HTTP(S) and log in. Fails if login fails.
    pub fn connect(config: XenConfig) -> XenResult<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, Box::new(transport))
    }

    /// Log in through a caller-supplied transport.
    pub fn with_transport(config: XenConfig, transport: Box<dyn Transport>) -> XenResult<Self> {
        let mut client = Self {
            transport,
            config,
            session: None,
            invalid_sessions: 0,
        };
        client.login()?;
        Ok(client)
    }

    /// Whether a session token is currently held.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Current session token, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Connection configuration.
    pub fn config(&self) -> &XenConfig {
        &self.config
    }

    // ── Session management ──────────────────────────────────────────

    fn login(&mut self) -> XenResult<()> {
        let params = [
            Value::String(self.config.username.clone()),
            Value::String(self.config.password.clone()),
            Value::String(self.config.api_version.clone()),
        ];
        let response = self.transport.send("session.login_with_password", &params)?;

        let token = response
            .as_object()
            .filter(|envelope| envelope.get("Status").and_then(Value::as_str) == Some("Success"))
            .and_then(|envelope| envelope.get("Value"))
            .and_then(Value::as_str);

        match token {
            Some(token) => {
                self.session = Some(token.to_string());
                info!(
                    "logged in to {} as {}",
                    self.config.hostname, self.config.username
                );
                Ok(())
            }
            None => Err(XenError::auth(login_failure_message(&response))),
        }
    }

    /// Release the held session with `session.logout`.
    ///
    /// The token is cleared even if the logout call fails, so teardown will
    /// not issue a second logout.
    pub fn logout(&mut self) -> XenResult<()> {
        if self.session.is_none() {
            return Ok(());
        }
        let result = self.call("session.logout", &[]);
        self.session = None;
        result.map(|_| ())
    }

    // ── Call relay ──────────────────────────────────────────────────

    /// Invoke a remote method, e.g. `call("VM.start", ...)`.
    ///
    /// The current session token is prepended to `args`. A `SESSION_INVALID`
    /// failure triggers an in-place re-login and retry; once the recovery
    /// budget is exhausted the call returns `Value::Null` with no error.
    pub fn call(&mut self, method: &str, args: &[Value]) -> XenResult<Value> {
        debug!("calling {method}");

        let mut params = Vec::with_capacity(args.len() + 1);
        params.push(self.session.clone().map_or(Value::Null, Value::String));
        params.extend_from_slice(args);

        let response = self.transport.send(method, &params)?;

        if response.is_null() {
            return Err(XenError::connectivity(
                "null response...check hostname or connectivity",
            ));
        }
        let envelope = response
            .as_object()
            .ok_or_else(|| XenError::protocol("bad or null response"))?;
        let status = envelope
            .get("Status")
            .and_then(Value::as_str)
            .ok_or_else(|| XenError::protocol("bad or null response"))?;

        if status == "Success" {
            return Ok(envelope.get("Value").cloned().unwrap_or(Value::Null));
        }

        let description = envelope.get("ErrorDescription").and_then(Value::as_array);

        if description.and_then(|d| d.first()).and_then(Value::as_str) == Some("SESSION_INVALID") {
            if self.invalid_sessions <= Self::MAX_INVALID_SESSIONS {
                self.invalid_sessions += 1;
                warn!(
                    "server invalidated the session, re-authenticating (recovery {})",
                    self.invalid_sessions
                );
                self.login()?;
                return self.call(method, args);
            }
            warn!("session recovery budget exhausted, dropping {method} call");
            return Ok(Value::Null);
        }

        match description {
            Some(description) => Err(XenError::remote(join_description(description))),
            None => Err(XenError::unknown_remote("unknown")),
        }
    }

    /// Invoke a remote method written in underscore form: `VM_start` →
    /// `VM.start`. Only the first underscore separates the module from the
    /// method, so `host_cpu_get_utilisation` → `host.cpu_get_utilisation`.
    pub fn call_underscored(&mut self, name: &str, args: &[Value]) -> XenResult<Value> {
        self.call(&underscored_to_dotted(name), args)
    }
}

impl fmt::Debug for XenClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XenClient")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("invalid_sessions", &self.invalid_sessions)
            .finish_non_exhaustive()
    }
}

impl Drop for XenClient {
    fn drop(&mut self) {
        if let Err(e) = self.logout() {
            warn!("logout during teardown failed: {e}");
        }
    }
}

fn login_failure_message(response: &Value) -> String {
    match response.get("ErrorDescription").and_then(Value::as_array) {
        Some(description) => join_description(description),
        None => "login failed: bad or null response".to_string(),
    }
}

fn join_description(description: &[Value]) -> String {
    description
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn underscored_to_dotted(name: &str) -> String {
    match name.split_once('_') {
        Some((module, method)) => format!("{module}.{method}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn underscore_split_is_first_only() {
        assert_eq!(underscored_to_dotted("VM_start"), "VM.start");
        assert_eq!(
            underscored_to_dotted("host_cpu_get_utilisation"),
            "host.cpu_get_utilisation"
        );
        assert_eq!(underscored_to_dotted("logout"), "logout");
    }

    #[test]
    fn description_join_handles_mixed_values() {
        let description = [json!("HOST_OFFLINE"), json!("OpaqueRef:h1"), json!(3)];
        assert_eq!(join_description(&description), "HOST_OFFLINE OpaqueRef:h1 3");
    }

    #[test]
    fn login_failure_message_prefers_description() {
        let response = json!({
            "Status": "Failure",
            "ErrorDescription": ["SESSION_AUTHENTICATION_FAILED", "root"]
        });
        assert_eq!(
            login_failure_message(&response),
            "SESSION_AUTHENTICATION_FAILED root"
        );
        assert_eq!(
            login_failure_message(&Value::Null),
            "login failed: bad or null response"
        );
    }
}
