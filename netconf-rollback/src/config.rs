use crate::commands::builtin::{value_of, value_of_if_exists};
use crate::device::{ArtifactPaths, EditTarget, SessionOptions};
use crate::error::{Error, Result};
use async_ssh2_lite::{AsyncSession, SessionConfiguration};
use clap::ArgMatches;
use dirs::home_dir;
use log::{debug, error, warn};
use netconf_client::message::{Platform, WithDefaultsValue};
use ssh2::MethodType;
use ssh2_config::{HostParams, ParseRule, SshConfig};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

pub const DEFAULT_NETCONF_PORT: u16 = 830;
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Everything parsed from the command line and `~/.ssh/config` for one run.
#[derive(Debug)]
pub struct Config {
    pub args: ArgMatches,
    pub target: DeviceTarget,
    pub options: SessionOptions,
}

impl Config {
    pub fn new(args: ArgMatches) -> Result<Self> {
        let mut ssh_file = home_dir().unwrap_or(PathBuf::from("/"));
        ssh_file.extend(Path::new(".ssh/config"));
        let params = match (read_ssh_config(&ssh_file), value_of_if_exists::<String>("host", &args)) {
            (Some(ssh_config), Some(host)) => ssh_config.query(host_part(host)),
            _ => HostParams::default(),
        };

        let host = value_of_if_exists::<String>("host", &args)
            .ok_or_else(|| Error::Config("No host provided (--host or NETCONF_HOST)".to_string()))?;
        let credentials = Credentials::new(
            value_of_if_exists::<String>("username", &args).cloned(),
            value_of_if_exists::<String>("password", &args).cloned(),
            value_of_if_exists::<String>("secret", &args).cloned(),
            &params,
        )?;
        let ssh_port = value_of_if_exists::<u16>("ssh-port", &args).copied();
        let target = DeviceTarget::new(host, ssh_port, credentials, params)?;

        let options = SessionOptions {
            platform: Platform::from_str(value_of::<String>("platform", &args))?,
            edit_target: EditTarget::from_str(value_of::<String>("target", &args))?,
            with_defaults: value_of_if_exists::<String>("with-defaults", &args)
                .map(|value| WithDefaultsValue::from_str(value))
                .transpose()?,
            read_timeout: Duration::from_secs(*value_of::<u64>("timeout", &args)),
            artifacts: ArtifactPaths {
                baseline: value_of::<PathBuf>("baseline", &args).clone(),
                diff_report: value_of::<PathBuf>("diff-report", &args).clone(),
            },
        };

        Ok(Self {
            args,
            target,
            options,
        })
    }
}

fn host_part(addr: &str) -> &str {
    addr.split(':').next().unwrap_or(addr)
}

fn read_ssh_config(path: &Path) -> Option<SshConfig> {
    debug!("Trying to parse ssh configuration '{}'", path.display());

    let mut reader = match File::open(path) {
        Ok(f) => BufReader::new(f),
        Err(err) => {
            debug!(
                "Could not open ssh config file '{}', error: {}",
                path.display(),
                err
            );
            return None;
        }
    };
    match SshConfig::default().parse(&mut reader, ParseRule::ALLOW_UNKNOWN_FIELDS) {
        Ok(config) => {
            debug!("Successfully parsed configuration");
            Some(config)
        }
        Err(err) => {
            error!("Failed to parse ssh configuration, error '{}'", err);
            None
        }
    }
}

/// Login credentials. `Debug` never prints the secrets.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: Option<String>,
    enable_secret: Option<String>,
}

impl Credentials {
    pub(crate) fn new(
        username: Option<String>,
        password: Option<String>,
        enable_secret: Option<String>,
        params: &HostParams,
    ) -> Result<Credentials> {
        let username = username
            .or_else(|| params.user.clone())
            .unwrap_or_else(whoami::username);
        if password.is_none() && params.identity_file.is_none() {
            return Err(Error::Config(
                "No password or identity file provided".to_string(),
            ));
        }
        Ok(Credentials {
            username,
            password,
            enable_secret,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Falls back to the login password, as most devices share the two.
    pub fn enable_secret(&self) -> &str {
        self.enable_secret
            .as_deref()
            .or(self.password.as_deref())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("enable_secret", &self.enable_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The device a session talks to: one address, two ports.
#[derive(Debug, Clone)]
pub struct DeviceTarget {
    pub(crate) address: String,
    pub(crate) netconf_port: u16,
    pub(crate) ssh_port: u16,
    pub(crate) credentials: Credentials,
    params: HostParams,
}

impl DeviceTarget {
    /// `addr` is `host` or `host:netconf-port`; `HostName` and `Port` from the ssh
    /// configuration apply to the address and the command-line port.
    pub(crate) fn new(
        addr: &str,
        ssh_port: Option<u16>,
        credentials: Credentials,
        params: HostParams,
    ) -> Result<DeviceTarget> {
        let (host, netconf_port) = match addr.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid port in '{}'", addr)))?;
                (host, port)
            }
            None => (addr, DEFAULT_NETCONF_PORT),
        };
        let address = params.host_name.clone().unwrap_or_else(|| host.to_string());
        let ssh_port = ssh_port.or(params.port).unwrap_or(DEFAULT_SSH_PORT);

        Ok(DeviceTarget {
            address,
            netconf_port,
            ssh_port,
            credentials,
            params,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Opens an authenticated SSH session to `port`. The host key is not verified.
    pub(crate) async fn connect_ssh(&self, port: u16) -> Result<AsyncSession<TcpStream>> {
        let stream = self.tcp_connect_timeout(port).await?;
        let mut configuration = SessionConfiguration::new();
        configuration.set_timeout(10_000);
        if let Some(compress) = self.params.compression {
            debug!(target: &self.address, "Setting compression: {}", compress);
            configuration.set_compress(compress);
        }
        if let (Some(true), Some(interval)) =
            (self.params.tcp_keep_alive, self.params.server_alive_interval)
        {
            debug!(target: &self.address, "Setting keepalive interval: {} seconds", interval.as_secs());
            configuration.set_keepalive(true, interval.as_secs() as u32);
        }
        let mut session = AsyncSession::new(stream, configuration)?;
        configure_session(&mut session, &self.params).await?;
        session.handshake().await?;

        let user = self.credentials.username();
        if let Some(password) = &self.credentials.password {
            session.userauth_password(user, password).await?;
        } else {
            let mut agent = session.agent()?;
            agent.connect().await?;
            agent.list_identities().await?;

            for identity in agent.identities()? {
                debug!(
                    target: &self.address,
                    "Trying authentication with public key '{}'",
                    identity.comment()
                );
                match agent.userauth(user, &identity).await {
                    Ok(_) => break,
                    Err(err) => {
                        warn!(
                            target: &self.address,
                            "Public key '{}' authentication failed: {}",
                            identity.comment(),
                            err
                        );
                    }
                }
            }
        }

        if session.authenticated() {
            Ok(session)
        } else {
            Err(Error::Authentication(user.to_string()))
        }
    }

    async fn tcp_connect_timeout(&self, port: u16) -> Result<TcpStream> {
        let limit = self.params.connect_timeout.unwrap_or(Duration::from_secs(10));
        debug!(target: &self.address, "Connecting to port {}", port);
        timeout(limit, TcpStream::connect((self.address.as_str(), port)))
            .await
            .map_err(|_| Error::Timeout(limit.as_secs()))?
            .map_err(Error::from)
    }
}

async fn configure_session(
    session: &mut AsyncSession<TcpStream>,
    params: &HostParams,
) -> Result<()> {
    let preferences = [
        (MethodType::Kex, params.kex_algorithms.as_deref()),
        (MethodType::HostKey, params.host_key_algorithms.as_deref()),
        (MethodType::CryptCs, params.ciphers.as_deref()),
        (MethodType::CryptSc, params.ciphers.as_deref()),
        (MethodType::MacCs, params.mac.as_deref()),
        (MethodType::MacSc, params.mac.as_deref()),
    ];
    for (method, algos) in preferences {
        if let Some(algos) = algos {
            session.method_pref(method, algos.join(",").as_str()).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn credentials() -> Credentials {
        Credentials::new(
            Some("admin".to_string()),
            Some("s3cret".to_string()),
            None,
            &HostParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn target_splits_netconf_port() {
        let target = DeviceTarget::new("198.51.100.7:2830", None, credentials(), HostParams::default())
            .unwrap();
        assert_eq!(target.address(), "198.51.100.7");
        assert_eq!(target.netconf_port, 2830);
        assert_eq!(target.ssh_port, DEFAULT_SSH_PORT);

        let target =
            DeviceTarget::new("edge-1", Some(2222), credentials(), HostParams::default()).unwrap();
        assert_eq!(target.netconf_port, DEFAULT_NETCONF_PORT);
        assert_eq!(target.ssh_port, 2222);

        assert!(matches!(
            DeviceTarget::new("edge-1:ssh", None, credentials(), HostParams::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn credentials_are_redacted_and_secret_falls_back() {
        let creds = credentials();
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("admin"));
        assert_eq!(creds.enable_secret(), "s3cret");

        let creds = Credentials::new(
            Some("admin".to_string()),
            Some("s3cret".to_string()),
            Some("en4ble".to_string()),
            &HostParams::default(),
        )
        .unwrap();
        assert_eq!(creds.enable_secret(), "en4ble");
        assert!(!format!("{:?}", creds).contains("en4ble"));
    }

    #[test]
    fn password_or_identity_is_required() {
        assert!(matches!(
            Credentials::new(Some("admin".to_string()), None, None, &HostParams::default()),
            Err(Error::Config(_))
        ));
    }
}
