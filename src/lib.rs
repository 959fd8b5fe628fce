//! # xenapi-client — XenServer / XCP-ng XenAPI client
//!
//! XML-RPC client for the XenAPI exposed by XenServer and XCP-ng hosts.
//! Logs in with credentials, holds the session token, relays arbitrary API
//! calls with the token prepended, and transparently re-authenticates when
//! the server reports the session as invalid. The held session is released
//! with `session.logout` when the client is dropped.
//!
//! ```no_run
//! use serde_json::json;
//! use xenapi_client::{XenClient, XenConfig};
//!
//! # fn main() -> Result<(), xenapi_client::XenError> {
//! let mut client = XenClient::connect(XenConfig {
//!     hostname: "xenserver.lab.local".into(),
//!     username: "root".into(),
//!     password: "secret".into(),
//!     ..Default::default()
//! })?;
//!
//! let vms = client.call("VM.get_all", &[])?;
//! client.call("VM.start", &[vms[0].clone(), json!(false), json!(false)])?;
//! # Ok(())
//! # }
//! ```
//!
//! Modules:
//! - **types** — connection configuration
//! - **error** — crate error type
//! - **xmlrpc** — XML-RPC wire codec over `serde_json::Value`
//! - **transport** — `Transport` trait + blocking HTTP(S) implementation
//! - **client** — session lifecycle, call relay, invalid-session recovery

pub mod client;
pub mod error;
pub mod transport;
pub mod types;
pub mod xmlrpc;

pub use client::XenClient;
pub use error::{XenError, XenErrorKind, XenResult};
pub use transport::{HttpTransport, Transport};
pub use types::XenConfig;
