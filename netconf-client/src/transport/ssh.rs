use crate::error::{NetconfClientError, NetconfClientResult};
use crate::framer::async_framer::AsyncFramer;
use crate::framer::Framer;
use crate::transport::Transport;
use async_ssh2_lite::{ssh2, AsyncChannel, AsyncSession, SessionConfiguration};
use async_trait::async_trait;
use log::debug;
use tokio::net::TcpStream;

/// NETCONF over the SSH `netconf` subsystem.
///
/// The server host key is never checked against `known_hosts`.
pub struct SSHTransport {
    session: AsyncSession<TcpStream>,
    framer: AsyncFramer<AsyncChannel<TcpStream>>,
}

impl SSHTransport {
    pub async fn new_with_session(
        session: AsyncSession<TcpStream>,
    ) -> NetconfClientResult<SSHTransport> {
        open_subsystem(session).await
    }

    pub async fn new_with_user_auth(
        addr: &str,
        user_name: &str,
        password: &str,
    ) -> NetconfClientResult<SSHTransport> {
        let stream = TcpStream::connect(addr).await?;
        let mut configuration = SessionConfiguration::new();
        configuration.set_timeout(10_000);
        let mut sess = AsyncSession::new(stream, configuration)?;
        sess.handshake().await?;

        sess.userauth_password(user_name, password).await?;
        open_subsystem(sess).await
    }
}

#[async_trait]
impl Transport for SSHTransport {
    async fn receive(&mut self) -> NetconfClientResult<String> {
        self.framer.read_async().await
    }

    async fn write(&mut self, rpc: &str) -> NetconfClientResult<()> {
        self.framer.write_async(rpc).await
    }

    async fn close(&mut self) -> NetconfClientResult<()> {
        let channel = self.framer.get_mut();
        channel.send_eof().await?;
        channel.close().await?;
        channel.wait_close().await?;
        self.session
            .disconnect(Some(ssh2::ByApplication), "Shutdown", None)
            .await?;
        debug!("NETCONF channel closed");
        Ok(())
    }

    async fn upgrade(&mut self) {
        self.framer.upgrade().await;
    }
}

async fn open_subsystem(session: AsyncSession<TcpStream>) -> NetconfClientResult<SSHTransport> {
    if !session.authenticated() {
        return Err(NetconfClientError::new(
            "ssh session is not authenticated".to_string(),
        ));
    }
    let mut channel = session.channel_session().await?;
    channel.subsystem("netconf").await?;
    Ok(SSHTransport {
        session,
        framer: AsyncFramer::new(channel),
    })
}
