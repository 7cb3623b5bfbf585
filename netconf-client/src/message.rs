use crate::{error, NETCONF_BASE_10_CAP, NETCONF_BASE_11_CAP, NETCONF_URN};
use core::fmt;
use core::fmt::Display;
use core::str::FromStr;
use quick_xml::se::Serializer;
use serde_derive::{Deserialize, Serialize};
use uuid::Uuid;

/// Capability profile advertised in the client `<hello>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// Base protocol versions only.
    Default,
    /// Cisco IOS-XE profile.
    #[default]
    IosXe,
}

impl Platform {
    pub fn capabilities(&self) -> Vec<String> {
        let mut caps = vec![
            NETCONF_BASE_10_CAP.to_string(),
            NETCONF_BASE_11_CAP.to_string(),
        ];
        if let Platform::IosXe = self {
            caps.extend(
                [
                    "urn:ietf:params:netconf:capability:writable-running:1.0",
                    "urn:ietf:params:netconf:capability:candidate:1.0",
                    "urn:ietf:params:netconf:capability:confirmed-commit:1.0",
                    "urn:ietf:params:netconf:capability:rollback-on-error:1.0",
                    "urn:ietf:params:netconf:capability:startup:1.0",
                    "urn:ietf:params:netconf:capability:validate:1.0",
                    "urn:ietf:params:netconf:capability:xpath:1.0",
                    "urn:ietf:params:netconf:capability:with-defaults:1.0",
                ]
                .map(str::to_string),
            );
        }
        caps
    }
}

impl FromStr for Platform {
    type Err = error::NetconfClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Platform::Default),
            "iosxe" | "ios-xe" => Ok(Platform::IosXe),
            _ => Err(error::NetconfClientError::new(format!(
                "unknown platform: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename(serialize = "hello"))]
pub struct Hello {
    #[serde(rename = "@xmlns", default)]
    xmlns: String,
    capabilities: Capabilities,
    #[serde(rename = "session-id", skip_serializing_if = "Option::is_none")]
    session_id: Option<u64>,
}

impl Hello {
    pub fn new(platform: Platform) -> Hello {
        Hello {
            xmlns: NETCONF_URN.to_string(),
            session_id: None,
            capabilities: Capabilities {
                capability: platform.capabilities(),
            },
        }
    }

    pub fn capabilities(&self) -> &[String] {
        &self.capabilities.capability
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities
            .capability
            .iter()
            .any(|cap| cap.trim() == capability)
    }

    pub fn session_id(&self) -> Option<u64> {
        self.session_id
    }
}

impl Display for Hello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use serde::Serialize;
        let mut buffer = String::with_capacity(512);
        let ser = Serializer::new(&mut buffer);
        self.serialize(ser).map_err(|_| fmt::Error)?;
        f.write_str(&buffer)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Capabilities {
    #[serde(default)]
    capability: Vec<String>,
}

/// Placeholder element replaced by the raw `<config>` payload of an edit.
const CONFIG_PLACEHOLDER: &str = "<config/>";

#[derive(Debug, Serialize)]
pub struct Rpc {
    #[serde(rename = "@message-id")]
    message_id: String,
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "$value")]
    operation: RpcOperation,
}

impl Rpc {
    pub fn new_with_operation(operation: RpcOperation) -> Rpc {
        Rpc {
            xmlns: NETCONF_URN.to_string(),
            message_id: Uuid::new_v4().to_string(),
            operation,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}

impl Display for Rpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use serde::Serialize;
        let mut buffer = String::with_capacity(256);
        let mut ser = Serializer::with_root(&mut buffer, Some("rpc")).map_err(|_| fmt::Error)?;
        ser.indent(' ', 2);
        self.serialize(ser).map_err(|_| fmt::Error)?;
        match &self.operation {
            RpcOperation::EditConfig(edit) => {
                f.write_str(&buffer.replacen(CONFIG_PLACEHOLDER, &edit.payload, 1))
            }
            _ => f.write_str(&buffer),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RpcOperation {
    CloseSession,
    DiscardChanges,
    Validate { source: Source },
    GetConfig(GetConfig),
    EditConfig(EditConfig),
    Commit,
}

impl RpcOperation {
    pub fn new_get_config(datastore: Datastore, defaults: Option<WithDefaultsValue>) -> RpcOperation {
        RpcOperation::GetConfig(GetConfig {
            source: Source { datastore },
            with_defaults: defaults.map(|value| WithDefaults {
                xmlns: "urn:ietf:params:xml:ns:yang:ietf-netconf-with-defaults".to_string(),
                value,
            }),
        })
    }

    /// `payload` must be a complete `<config>` element; it is inserted verbatim.
    pub fn new_edit_config(
        target: Datastore,
        payload: &str,
        default_operation: Option<DefaultOperation>,
    ) -> RpcOperation {
        RpcOperation::EditConfig(EditConfig {
            target: Target { datastore: target },
            default_operation: default_operation.map(|op| op.as_str()),
            config: (),
            payload: payload.trim().to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct GetConfig {
    source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    with_defaults: Option<WithDefaults>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EditConfig {
    target: Target,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_operation: Option<&'static str>,
    config: (),
    #[serde(skip)]
    payload: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultOperation {
    Merge,
    Replace,
    None,
}

impl DefaultOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultOperation::Merge => "merge",
            DefaultOperation::Replace => "replace",
            DefaultOperation::None => "none",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WithDefaults {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "$text")]
    value: WithDefaultsValue,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WithDefaultsValue {
    ReportAll,
    ReportAllTagged,
    Trim,
    Explicit,
}

impl FromStr for WithDefaultsValue {
    type Err = error::NetconfClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "report-all" => Ok(WithDefaultsValue::ReportAll),
            "report-all-tagged" => Ok(WithDefaultsValue::ReportAllTagged),
            "trim" => Ok(WithDefaultsValue::Trim),
            "explicit" => Ok(WithDefaultsValue::Explicit),
            _ => Err(error::NetconfClientError::new(format!(
                "unknown with-defaults value: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Source {
    #[serde(rename = "$value")]
    pub datastore: Datastore,
}

#[derive(Debug, Serialize)]
pub struct Target {
    #[serde(rename = "$value")]
    pub datastore: Datastore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Datastore {
    Candidate,
    Running,
    Startup,
}

impl Display for Datastore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Datastore::Candidate => "candidate",
            Datastore::Running => "running",
            Datastore::Startup => "startup",
        })
    }
}

impl FromStr for Datastore {
    type Err = error::NetconfClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let datastore = s.to_lowercase();
        match datastore.as_str() {
            "running" => Ok(Datastore::Running),
            "candidate" => Ok(Datastore::Candidate),
            "startup" => Ok(Datastore::Startup),
            _ => Err(error::NetconfClientError::UnknownDatastore {
                expected: vec![
                    "running".to_string(),
                    "candidate".to_string(),
                    "startup".to_string(),
                ],
                unknown: datastore,
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", rename(serialize = "rpc-reply"))]
pub struct RpcReply {
    #[serde(rename = "@message-id", default)]
    message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rpc_error: Option<Vec<Error>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ok: Option<()>,
}

impl RpcReply {
    pub fn is_ok(&self) -> bool {
        self.ok.is_some() && self.rpc_error.is_none()
    }

    /// Warnings do not fail an operation; only `error-severity` `error` does.
    pub fn has_errors(&self) -> bool {
        self.rpc_error
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.error_severity == ErrorSeverity::Error))
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn error_messages(&self) -> Vec<&str> {
        self.rpc_error
            .iter()
            .flatten()
            .filter_map(|e| e.error_message.as_deref())
            .map(str::trim)
            .collect()
    }
}

impl Display for RpcReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use serde::Serialize;
        let mut buffer = String::with_capacity(512);
        let mut ser = Serializer::new(&mut buffer);
        ser.indent(' ', 2);
        self.serialize(ser).map_err(|_| fmt::Error)?;
        f.write_str(&buffer)
    }
}

impl std::error::Error for RpcReply {}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename = "rpc-error", rename_all = "kebab-case")]
pub struct Error {
    error_type: ErrorType,
    error_tag: String,
    error_severity: ErrorSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_app_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ErrorType {
    Transport,
    Rpc,
    Protocol,
    #[serde(rename = "application", alias = "app")]
    Application,
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ErrorSeverity {
    Error,
    Warning,
}
