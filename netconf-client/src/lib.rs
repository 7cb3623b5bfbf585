//! # netconf-client
//!
//! Minimal async NETCONF client: RFC 6242 framing over an SSH `netconf` subsystem,
//! the handful of RFC 6241 operations needed to export a running configuration and
//! push a replacement through the candidate datastore, and XML helpers for the
//! documents that travel with them.
//!
//! ```toml
//! netconf-client = { path = "../netconf-client" }
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use netconf_client::connection::Connection;
//! use netconf_client::message::{Datastore, DefaultOperation, Platform};
//! use netconf_client::transport::ssh::SSHTransport;
//!
//! # async fn run() -> netconf_client::error::NetconfClientResult<()> {
//! let transport = SSHTransport::new_with_user_auth("192.0.2.1:830", "admin", "secret").await?;
//! let mut conn = Connection::new(transport, Platform::IosXe).await?;
//! let running = conn.get_config(Datastore::Running, None).await?;
//! conn.edit_config(Datastore::Candidate, "<config/>", Some(DefaultOperation::Replace))
//!     .await?;
//! conn.commit().await?;
//! conn.close_session().await?;
//! # let _ = running;
//! # Ok(())
//! # }
//! ```
//!
pub mod connection;
pub mod error;
pub mod framer;
pub mod message;
pub mod transport;
pub mod xml;

pub const NETCONF_URN: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";
pub const NETCONF_BASE_10_CAP: &str = "urn:ietf:params:netconf:base:1.0";
pub const NETCONF_BASE_11_CAP: &str = "urn:ietf:params:netconf:base:1.1";
pub const CANDIDATE_CAP: &str = "urn:ietf:params:netconf:capability:candidate:1.0";
pub const VALIDATE_10_CAP: &str = "urn:ietf:params:netconf:capability:validate:1.0";
pub const VALIDATE_11_CAP: &str = "urn:ietf:params:netconf:capability:validate:1.1";
