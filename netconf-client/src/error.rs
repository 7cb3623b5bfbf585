use crate::message;
use thiserror::Error;

pub type NetconfClientResult<T> = Result<T, NetconfClientError>;

#[derive(Debug, Error)]
pub enum NetconfClientError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "async-ssh2-lite")]
    #[error(transparent)]
    Ssh(#[from] async_ssh2_lite::Error),
    #[error(transparent)]
    SerializingFailure(#[from] quick_xml::DeError),
    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("remote procedure call failed:\n{0}")]
    Netconf(#[from] message::RpcReply),
    #[error("unknown datastore {}, (expected {:?})", unknown, expected)]
    UnknownDatastore {
        expected: Vec<String>,
        unknown: String,
    },
    #[error("element <{0}> not found in reply")]
    MissingElement(String),
    #[error(
        "malformed message chunk (expected {:?}, actual {:?})",
        expected,
        actual
    )]
    MalformedChunk { expected: char, actual: char },
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl NetconfClientError {
    pub fn new(msg: String) -> Self {
        NetconfClientError::Anyhow(anyhow::Error::msg(msg))
    }

    /// True when the device answered with `<rpc-error>`, as opposed to a local or
    /// transport failure.
    pub fn is_rpc_error(&self) -> bool {
        matches!(self, NetconfClientError::Netconf(_))
    }
}
