use netconf_client::error::NetconfClientError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The two remote channels held by a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Cli,
    Management,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Cli => f.write_str("command-line"),
            Channel::Management => f.write_str("management (NETCONF)"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Netconf(#[from] NetconfClientError),
    #[error(transparent)]
    Ssh(#[from] async_ssh2_lite::Error),
    #[error(transparent)]
    LibSsh2(#[from] ssh2::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0} connection is not open")]
    NotConnected(Channel),
    #[error("device does not advertise capability {0}")]
    UnsupportedCapability(&'static str),
    #[error("no prompt from device within {0} seconds")]
    Timeout(u64),
    #[error("command-line channel closed by device")]
    ChannelClosed,
    #[error("could not enter privileged mode, prompt is '{0}'")]
    Privilege(String),
    #[error("authentication failed for user '{0}'")]
    Authentication(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }
}
