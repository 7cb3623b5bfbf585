//! In-memory device answering NETCONF rpcs and a small CLI, for unit tests.

use crate::config::{Credentials, DeviceTarget};
use crate::connector::Connector;
use crate::device::{ArtifactPaths, DeviceSession, SessionOptions, DEFAULT_BASELINE, DEFAULT_DIFF_REPORT};
use crate::error::{Error, Result};
use crate::shell::{ShellStream, SHOW_RUNNING};
use async_trait::async_trait;
use log::{LevelFilter, Log, Metadata, Record};
use netconf_client::connection::Connection;
use netconf_client::error::{NetconfClientError, NetconfClientResult};
use netconf_client::message::Platform;
use netconf_client::transport::Transport;
use netconf_client::xml::{extract_element, pretty_print};
use netconf_client::{NETCONF_BASE_10_CAP, NETCONF_URN, CANDIDATE_CAP, VALIDATE_10_CAP};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use ssh2_config::HostParams;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

pub(crate) const ENABLE_SECRET: &str = "en4ble";
const USER_PROMPT: &str = "edge-1>";
const ENABLE_PROMPT: &str = "edge-1#";

const INITIAL_RUNNING: &str = r#"<native xmlns="http://cisco.com/ns/yang/Cisco-IOS-XE-native"><hostname>edge-1</hostname><interface><Loopback><name>0</name><description>uplink</description></Loopback></interface></native>"#;

pub(crate) type SharedDevice = Arc<Mutex<FakeDevice>>;

#[derive(Debug)]
pub(crate) struct FakeDevice {
    pub running: String,
    pub candidate: String,
    pub commits: usize,
    pub discards: usize,
    pub candidate_capable: bool,
    pub reachable: bool,
    pub split_banner: bool,
    pub rpcs: Vec<String>,
    pub cli_commands: Vec<String>,
}

impl FakeDevice {
    pub fn shared() -> SharedDevice {
        Arc::new(Mutex::new(FakeDevice {
            running: INITIAL_RUNNING.to_string(),
            candidate: INITIAL_RUNNING.to_string(),
            commits: 0,
            discards: 0,
            candidate_capable: true,
            reachable: true,
            split_banner: false,
            rpcs: Vec::new(),
            cli_commands: Vec::new(),
        }))
    }

    /// What `show running-config` prints: the running datastore as indented XML.
    pub fn show_run(&self) -> String {
        let doc = pretty_print(&format!("<config>{}</config>", self.running)).unwrap();
        format!("Building configuration...\n\n{}end\n", doc)
    }

    fn handle(&mut self, message: &str) -> String {
        self.rpcs.push(message.to_string());
        if message.contains("<hello") {
            return self.hello();
        }
        let id = message_id(message);
        if message.contains("<get-config>") {
            return reply(&id, &format!("<data>{}</data>", self.running));
        }
        if message.contains("<edit-config>") {
            let config = extract_element(message, "config").unwrap();
            let target = extract_element(message, "target").unwrap();
            let inner = canonical(inner_xml(&config));
            if target.contains("<running/>") {
                self.running = inner;
            } else {
                self.candidate = inner;
            }
        } else if message.contains("<validate>") {
            if self.candidate.contains("<invalid") {
                return reply(
                    &id,
                    "<rpc-error><error-type>application</error-type><error-tag>unknown-element</error-tag>\
                     <error-severity>error</error-severity>\
                     <error-message>invalid-leaf is not a known element</error-message></rpc-error>",
                );
            }
        } else if message.contains("<commit/>") {
            self.commits += 1;
            self.running = self.candidate.clone();
        } else if message.contains("<discard-changes/>") {
            self.discards += 1;
            self.candidate = self.running.clone();
        }
        reply(&id, "<ok/>")
    }

    fn hello(&self) -> String {
        let mut caps = vec![NETCONF_BASE_10_CAP, VALIDATE_10_CAP];
        if self.candidate_capable {
            caps.push(CANDIDATE_CAP);
        }
        let caps: String = caps
            .iter()
            .map(|cap| format!("<capability>{}</capability>", cap))
            .collect();
        format!(
            r#"<hello xmlns="{}"><capabilities>{}</capabilities><session-id>42</session-id></hello>"#,
            NETCONF_URN, caps
        )
    }

    fn respond_cli(&mut self, command: &str, prompt: &str) -> String {
        self.cli_commands.push(command.to_string());
        let mut out = format!("{}\r\n", command);
        if command == SHOW_RUNNING {
            for line in self.show_run().lines() {
                out.push_str(line);
                out.push_str("\r\n");
            }
        }
        out.push_str(prompt);
        out
    }
}

fn message_id(message: &str) -> String {
    message
        .split_once("message-id=\"")
        .and_then(|(_, rest)| rest.split_once('"'))
        .map(|(id, _)| id.to_string())
        .unwrap_or_default()
}

fn reply(id: &str, body: &str) -> String {
    format!(
        r#"<rpc-reply message-id="{}" xmlns="{}">{}</rpc-reply>"#,
        id, NETCONF_URN, body
    )
}

fn inner_xml(element: &str) -> &str {
    match (element.find('>'), element.rfind("</")) {
        (Some(start), Some(end)) if start < end => &element[start + 1..end],
        _ => "",
    }
}

/// Stored form of a datastore: whitespace between elements dropped, text kept as sent.
pub(crate) fn canonical(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    loop {
        match reader.read_event().unwrap() {
            Event::Eof => break,
            Event::Decl(_) => {}
            Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => {}
            event => writer.write_event(event).unwrap(),
        }
    }
    String::from_utf8(writer.into_inner()).unwrap()
}

/// Starts the device side of a command-line session and returns the client end.
pub(crate) fn spawn_cli(device: SharedDevice) -> DuplexStream {
    let (client, server) = duplex(64 * 1024);
    tokio::spawn(async move {
        let _ = serve_cli(server, device).await;
    });
    client
}

async fn serve_cli(stream: DuplexStream, device: SharedDevice) -> std::io::Result<()> {
    let (read, mut write) = tokio::io::split(stream);
    let mut lines = BufReader::new(read).lines();
    let mut prompt = USER_PROMPT;
    let mut awaiting_secret = false;
    if device.lock().unwrap().split_banner {
        write.write_all(b"\r\n<Authorized users only>").await?;
        write.flush().await?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    } else {
        write.write_all(b"\r\nAuthorized access only").await?;
    }
    write
        .write_all(format!("\r\n\r\n{}", prompt).as_bytes())
        .await?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches('\r');
        let out = if awaiting_secret {
            awaiting_secret = false;
            if line == ENABLE_SECRET {
                prompt = ENABLE_PROMPT;
                format!("\r\n{}", prompt)
            } else {
                format!("\r\n% Access denied\r\n\r\n{}", prompt)
            }
        } else if line == "enable" {
            device.lock().unwrap().cli_commands.push(line.to_string());
            awaiting_secret = true;
            "enable\r\nPassword: ".to_string()
        } else if line == "exit" {
            device.lock().unwrap().cli_commands.push(line.to_string());
            write.write_all(b"exit\r\n").await?;
            return Ok(());
        } else {
            device.lock().unwrap().respond_cli(line, prompt)
        };
        write.write_all(out.as_bytes()).await?;
    }
    Ok(())
}

/// NETCONF transport backed by a [`FakeDevice`].
pub(crate) struct FakeTransport {
    device: SharedDevice,
    replies: VecDeque<String>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn receive(&mut self) -> NetconfClientResult<String> {
        self.replies
            .pop_front()
            .ok_or_else(|| NetconfClientError::new("no reply queued".to_string()))
    }

    async fn write(&mut self, rpc: &str) -> NetconfClientResult<()> {
        let reply = self.device.lock().unwrap().handle(rpc);
        self.replies.push_back(reply);
        Ok(())
    }

    async fn close(&mut self) -> NetconfClientResult<()> {
        Ok(())
    }

    async fn upgrade(&mut self) {}
}

pub(crate) struct FakeConnector {
    device: SharedDevice,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open_cli(&self, _target: &DeviceTarget) -> Result<Box<dyn ShellStream>> {
        self.check_reachable()?;
        Ok(Box::new(spawn_cli(self.device.clone())))
    }

    async fn open_mgmt(&self, _target: &DeviceTarget, platform: Platform) -> Result<Connection> {
        self.check_reachable()?;
        let transport = FakeTransport {
            device: self.device.clone(),
            replies: VecDeque::new(),
        };
        Ok(Connection::new(transport, platform).await?)
    }
}

impl FakeConnector {
    fn check_reachable(&self) -> Result<()> {
        if self.device.lock().unwrap().reachable {
            Ok(())
        } else {
            Err(Error::Io(std::io::ErrorKind::ConnectionRefused.into()))
        }
    }
}

/// Session against `device` writing its artifacts into `dir`.
pub(crate) fn session(device: SharedDevice, dir: &Path) -> DeviceSession {
    let credentials = Credentials::new(
        Some("admin".to_string()),
        Some("s3cret".to_string()),
        Some(ENABLE_SECRET.to_string()),
        &HostParams::default(),
    )
    .unwrap();
    let target = DeviceTarget::new("edge-1", None, credentials, HostParams::default()).unwrap();
    let options = SessionOptions {
        artifacts: ArtifactPaths {
            baseline: dir.join(DEFAULT_BASELINE),
            diff_report: dir.join(DEFAULT_DIFF_REPORT),
        },
        ..SessionOptions::default()
    };
    DeviceSession::new(target, options, Box::new(FakeConnector { device }))
}

static CAPTURED_LOGS: Mutex<Vec<(String, String)>> = Mutex::new(Vec::new());

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED_LOGS
            .lock()
            .unwrap()
            .push((record.target().to_string(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Routes log records into memory for [`captured_logs`]. Safe to call from every test.
pub(crate) fn capture_logs() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }
}

/// Targets of captured records whose message starts with `prefix`.
pub(crate) fn captured_logs(prefix: &str) -> Vec<String> {
    CAPTURED_LOGS
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, message)| message.starts_with(prefix))
        .map(|(target, _)| target.clone())
        .collect()
}
