use crate::error::{NetconfClientError, NetconfClientResult};
use crate::message::{
    Datastore, DefaultOperation, Hello, Platform, Rpc, RpcOperation, RpcReply, Source,
    WithDefaultsValue,
};
use crate::transport::Transport;
use crate::NETCONF_BASE_11_CAP;
use log::{debug, warn};
use quick_xml::de::from_str;

pub struct Connection {
    pub(crate) transport: Box<dyn Transport + Send + 'static>,

    session_id: Option<u64>,
    server_capabilities: Vec<String>,
    is_closed: bool,
}

impl Connection {
    /// Exchanges `<hello>` messages, advertising `platform`'s capability profile.
    pub async fn new<T>(transport: T, platform: Platform) -> NetconfClientResult<Connection>
    where
        T: Transport + 'static,
    {
        let mut conn = Connection {
            transport: Box::from(transport),
            session_id: None,
            server_capabilities: Vec::new(),
            is_closed: false,
        };
        conn.hello(platform).await?;
        Ok(conn)
    }

    pub fn session_id(&self) -> u64 {
        self.session_id.unwrap_or(0)
    }

    pub fn server_capabilities(&self) -> &[String] {
        &self.server_capabilities
    }

    /// Capabilities may carry `?module=` parameters; only the URI part is compared.
    pub fn supports(&self, capability: &str) -> bool {
        self.server_capabilities
            .iter()
            .any(|cap| cap.split('?').next() == Some(capability))
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    async fn hello(&mut self, platform: Platform) -> NetconfClientResult<()> {
        let hello = Hello::new(platform);
        let response = self.transport.write_and_receive(&hello.to_string()).await?;
        debug!("Hello:\n{}", response);

        let server: Hello = from_str(&response)?;
        self.server_capabilities = server
            .capabilities()
            .iter()
            .map(|cap| cap.trim().to_string())
            .collect();
        if server.has_capability(NETCONF_BASE_11_CAP) {
            self.transport.upgrade().await;
        }
        self.session_id = server.session_id();
        Ok(())
    }

    /// GetConfig implements the `<get-config>` rpc operation defined in [RFC6241 7.1].
    /// Returns the whole `<rpc-reply>` document.
    ///
    /// [RFC6241 7.1]: https://www.rfc-editor.org/rfc/rfc6241.html#section-7.1
    pub async fn get_config(
        &mut self,
        datastore: Datastore,
        defaults: Option<WithDefaultsValue>,
    ) -> NetconfClientResult<String> {
        let get_config = Rpc::new_with_operation(RpcOperation::new_get_config(datastore, defaults));
        self.run_rpc(get_config).await
    }

    /// `<edit-config>` as defined in [RFC6241 7.2]. `config` must be a `<config>` element.
    ///
    /// [RFC6241 7.2]: https://www.rfc-editor.org/rfc/rfc6241.html#section-7.2
    pub async fn edit_config(
        &mut self,
        target: Datastore,
        config: &str,
        default_operation: Option<DefaultOperation>,
    ) -> NetconfClientResult<String> {
        let edit = Rpc::new_with_operation(RpcOperation::new_edit_config(
            target,
            config,
            default_operation,
        ));
        self.run_rpc(edit).await
    }

    pub async fn validate(&mut self, datastore: Datastore) -> NetconfClientResult<String> {
        let validate = Rpc::new_with_operation(RpcOperation::Validate {
            source: Source { datastore },
        });
        self.run_rpc(validate).await
    }

    pub async fn commit(&mut self) -> NetconfClientResult<String> {
        self.run_rpc(Rpc::new_with_operation(RpcOperation::Commit))
            .await
    }

    /// Reverts the candidate datastore to the current running configuration.
    pub async fn discard_changes(&mut self) -> NetconfClientResult<String> {
        self.run_rpc(Rpc::new_with_operation(RpcOperation::DiscardChanges))
            .await
    }

    /// Sends `<close-session>` and tears down the transport. Calling it again is a no-op.
    pub async fn close_session(&mut self) -> NetconfClientResult<()> {
        if self.is_closed {
            return Ok(());
        }
        self.is_closed = true;
        let reply = self
            .exchange(Rpc::new_with_operation(RpcOperation::CloseSession))
            .await;
        let closed = self.transport.close().await;
        reply?;
        closed
    }

    async fn run_rpc(&mut self, rpc: Rpc) -> NetconfClientResult<String> {
        if self.is_closed {
            return Err(NetconfClientError::new(
                "netconf session already closed".to_string(),
            ));
        }
        self.exchange(rpc).await
    }

    async fn exchange(&mut self, rpc: Rpc) -> NetconfClientResult<String> {
        let response = self.transport.write_and_receive(&rpc.to_string()).await?;
        debug!("RPC {} reply:\n{}", rpc.message_id(), response);

        let reply: RpcReply = from_str(&response)?;
        if reply.has_errors() {
            return Err(NetconfClientError::Netconf(reply));
        }
        Ok(response)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.is_closed {
            warn!(
                "NETCONF session {} dropped without close-session",
                self.session_id()
            );
        }
    }
}
