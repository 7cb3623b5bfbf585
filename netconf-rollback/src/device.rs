//! One network device reached over two channels: an interactive command line for
//! snapshots and NETCONF for configuration changes.

use crate::config::DeviceTarget;
use crate::connector::Connector;
use crate::diff::DiffReport;
use crate::error::{Channel, Error, Result};
use crate::shell::{CliSession, SHOW_RUNNING};
use log::{debug, error, info, warn};
use netconf_client::connection::Connection;
use netconf_client::message::{Datastore, DefaultOperation, Platform, WithDefaultsValue};
use netconf_client::xml;
use netconf_client::{CANDIDATE_CAP, VALIDATE_10_CAP, VALIDATE_11_CAP};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASELINE: &str = "base_config.xml";
pub const DEFAULT_DIFF_REPORT: &str = "config_diff.html";

/// Where the session writes its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub baseline: PathBuf,
    pub diff_report: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        ArtifactPaths {
            baseline: PathBuf::from(DEFAULT_BASELINE),
            diff_report: PathBuf::from(DEFAULT_DIFF_REPORT),
        }
    }
}

/// Datastore that receives `<edit-config>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditTarget {
    /// Edit, validate and commit the candidate; discard it when any step fails.
    #[default]
    Candidate,
    /// Edit running directly, for devices without a candidate datastore.
    Running,
}

impl FromStr for EditTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "candidate" => Ok(EditTarget::Candidate),
            "running" => Ok(EditTarget::Running),
            _ => Err(Error::Config(format!(
                "unknown edit target '{}', expected candidate or running",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub platform: Platform,
    pub edit_target: EditTarget,
    pub with_defaults: Option<WithDefaultsValue>,
    pub read_timeout: Duration,
    pub artifacts: ArtifactPaths,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            platform: Platform::default(),
            edit_target: EditTarget::default(),
            with_defaults: None,
            read_timeout: Duration::from_secs(30),
            artifacts: ArtifactPaths::default(),
        }
    }
}

/// Result of [`DeviceSession::apply_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub diff_report: PathBuf,
    pub added: usize,
    pub removed: usize,
}

impl ApplyReport {
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Both connections start closed and are opened on demand. Call [`DeviceSession::close`]
/// when done, also after a failed operation.
pub struct DeviceSession {
    target: DeviceTarget,
    options: SessionOptions,
    connector: Box<dyn Connector>,
    cli: Option<CliSession>,
    mgmt: Option<Connection>,
}

impl DeviceSession {
    pub fn new(
        target: DeviceTarget,
        options: SessionOptions,
        connector: Box<dyn Connector>,
    ) -> DeviceSession {
        DeviceSession {
            target,
            options,
            connector,
            cli: None,
            mgmt: None,
        }
    }

    pub fn host(&self) -> &str {
        self.target.address()
    }

    pub fn is_cli_open(&self) -> bool {
        self.cli.is_some()
    }

    pub fn is_mgmt_open(&self) -> bool {
        self.mgmt.is_some()
    }

    /// Opens the command line in privileged mode, closing a previous one first.
    pub async fn open_cli(&mut self) -> Result<()> {
        if let Some(mut previous) = self.cli.take() {
            debug!(target: self.target.address(), "Reopening command-line session");
            if let Err(err) = previous.close().await {
                warn!(target: self.target.address(), "Closing previous command-line session failed: {}", err);
            }
        }
        let stream = self.connector.open_cli(&self.target).await?;
        let cli = CliSession::start(
            stream,
            self.target.credentials.enable_secret(),
            self.options.read_timeout,
        )
        .await?;
        info!(target: self.target.address(), "Command-line session ready at '{}'", cli.prompt());
        self.cli = Some(cli);
        Ok(())
    }

    /// Opens NETCONF, replacing a previous connection.
    pub async fn open_mgmt(&mut self) -> Result<()> {
        if let Some(mut previous) = self.mgmt.take() {
            debug!(target: self.target.address(), "Reopening NETCONF session");
            if let Err(err) = previous.close_session().await {
                warn!(target: self.target.address(), "Closing previous NETCONF session failed: {}", err);
            }
        }
        let connection = self
            .connector
            .open_mgmt(&self.target, self.options.platform)
            .await?;
        self.mgmt = Some(connection);
        Ok(())
    }

    /// Saves the running configuration as pretty-printed XML to the baseline path.
    pub async fn export_config(&mut self) -> Result<PathBuf> {
        let with_defaults = self.options.with_defaults;
        let mgmt = self.mgmt()?;
        let reply = mgmt.get_config(Datastore::Running, with_defaults).await?;
        let config = xml::config_from_reply(&reply)?;

        let path = self.options.artifacts.baseline.clone();
        tokio::fs::write(&path, config)
            .await
            .map_err(|err| Error::file(&path, err))?;
        info!(target: self.target.address(), "Exported running configuration to '{}'", path.display());
        Ok(path)
    }

    /// Pushes the document at `path` and writes an HTML diff of `show running-config`
    /// taken before and after. Reopens the command line.
    pub async fn apply_config(&mut self, path: &Path) -> Result<ApplyReport> {
        self.mgmt()?;
        let payload = read_payload(path).await?;

        self.open_cli().await?;
        let before = self.snapshot_running().await?;

        let host = self.target.address().to_string();
        let edit_target = self.options.edit_target;
        let reply = push_config(self.mgmt()?, &host, edit_target, &payload).await?;
        info!(target: &host, "Applied '{}', device replied:\n{}", path.display(), reply);

        let after = self.snapshot_running().await?;
        let diff = DiffReport::new(&before, &after);
        let diff_report = self.options.artifacts.diff_report.clone();
        diff.write_html(&diff_report, "Before apply", "After apply")
            .await?;

        Ok(ApplyReport {
            diff_report,
            added: diff.added(),
            removed: diff.removed(),
        })
    }

    /// Pushes the document at `path` the same way as [`DeviceSession::apply_config`],
    /// without snapshots.
    pub async fn restore_config(&mut self, path: &Path) -> Result<()> {
        self.mgmt()?;
        let payload = read_payload(path).await?;
        let host = self.target.address().to_string();
        let edit_target = self.options.edit_target;
        let reply = push_config(self.mgmt()?, &host, edit_target, &payload).await?;
        info!(target: &host, "Restored configuration from '{}'", path.display());
        debug!(target: &host, "Device reply:\n{}", reply);
        Ok(())
    }

    /// `show running-config` split into lines, exactly as printed.
    pub async fn snapshot_running(&mut self) -> Result<Vec<String>> {
        let cli = self.cli.as_mut().ok_or(Error::NotConnected(Channel::Cli))?;
        let output = cli.send_command(SHOW_RUNNING).await?;
        Ok(output.lines().map(str::to_string).collect())
    }

    /// Closes whatever is open. Returns the first failure, after trying both.
    pub async fn close(&mut self) -> Result<()> {
        let mut result = Ok(());
        if let Some(mut cli) = self.cli.take() {
            if let Err(err) = cli.close().await {
                warn!(target: self.target.address(), "Closing command-line session failed: {}", err);
                result = Err(err);
            }
        }
        if let Some(mut mgmt) = self.mgmt.take() {
            if let Err(err) = mgmt.close_session().await {
                warn!(target: self.target.address(), "Closing NETCONF session failed: {}", err);
                if result.is_ok() {
                    result = Err(err.into());
                }
            }
        }
        result
    }

    fn mgmt(&mut self) -> Result<&mut Connection> {
        self.mgmt
            .as_mut()
            .ok_or(Error::NotConnected(Channel::Management))
    }
}

async fn read_payload(path: &Path) -> Result<String> {
    let doc = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| Error::file(path, err))?;
    Ok(xml::to_config_payload(&doc)?)
}

/// Replaces the target datastore's contents with `payload` and returns the last reply.
async fn push_config(
    mgmt: &mut Connection,
    host: &str,
    target: EditTarget,
    payload: &str,
) -> Result<String> {
    match target {
        EditTarget::Running => Ok(mgmt
            .edit_config(Datastore::Running, payload, Some(DefaultOperation::Replace))
            .await?),
        EditTarget::Candidate => {
            if !mgmt.supports(CANDIDATE_CAP) {
                return Err(Error::UnsupportedCapability(CANDIDATE_CAP));
            }
            match edit_candidate(mgmt, host, payload).await {
                Ok(reply) => Ok(reply),
                Err(err) => {
                    warn!(target: host, "Candidate edit failed, discarding changes: {}", err);
                    if let Err(discard) = mgmt.discard_changes().await {
                        error!(target: host, "Discard-changes failed: {}", discard);
                    }
                    Err(err)
                }
            }
        }
    }
}

async fn edit_candidate(mgmt: &mut Connection, host: &str, payload: &str) -> Result<String> {
    mgmt.edit_config(Datastore::Candidate, payload, Some(DefaultOperation::Replace))
        .await?;
    if mgmt.supports(VALIDATE_10_CAP) || mgmt.supports(VALIDATE_11_CAP) {
        mgmt.validate(Datastore::Candidate).await?;
    } else {
        warn!(target: host, "Device does not support validate, committing unvalidated candidate");
    }
    Ok(mgmt.commit().await?)
}
