use crate::config::DeviceTarget;
use crate::error::Result;
use crate::shell::ShellStream;
use async_trait::async_trait;
use log::{debug, info};
use netconf_client::connection::Connection;
use netconf_client::message::Platform;
use netconf_client::transport::ssh::SSHTransport;

/// Opens the raw channels a device session is built on.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Interactive shell with a pseudo-terminal, before any login handling.
    async fn open_cli(&self, target: &DeviceTarget) -> Result<Box<dyn ShellStream>>;

    /// NETCONF session with the hello exchange done.
    async fn open_mgmt(&self, target: &DeviceTarget, platform: Platform) -> Result<Connection>;
}

/// SSH to the device, the shell on the SSH port and NETCONF on the NETCONF port.
pub struct SshConnector;

#[async_trait]
impl Connector for SshConnector {
    async fn open_cli(&self, target: &DeviceTarget) -> Result<Box<dyn ShellStream>> {
        let session = target.connect_ssh(target.ssh_port).await?;
        let mut channel = session.channel_session().await?;
        channel
            .request_pty("vt100", None, Some((511, 24, 0, 0)))
            .await?;
        channel.shell().await?;
        info!(target: target.address(), "Opened command-line session on port {}", target.ssh_port);
        Ok(Box::new(channel))
    }

    async fn open_mgmt(&self, target: &DeviceTarget, platform: Platform) -> Result<Connection> {
        let session = target.connect_ssh(target.netconf_port).await?;
        let transport = SSHTransport::new_with_session(session).await?;
        let connection = Connection::new(transport, platform).await?;
        info!(target: target.address(), "Connected NETCONF on port {}", target.netconf_port);
        debug!(
            target: target.address(),
            "Started Netconf session with session-id: {}",
            connection.session_id()
        );
        Ok(connection)
    }
}
