//! Interactive command-line session on a network device.
//!
//! The device is driven like a terminal user would: write a line, then read until the
//! prompt comes back. A line is a prompt when it ends in `>` (user mode) or `#`
//! (privileged mode).

use crate::error::{Error, Result};
use log::{debug, trace, warn};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

pub const SHOW_RUNNING: &str = "show running-config";
const SETUP_COMMANDS: [&str; 2] = ["terminal length 0", "terminal width 511"];
/// Silence after the login output that marks the banner as finished.
const QUIET_PERIOD: Duration = Duration::from_millis(200);

pub trait ShellStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ShellStream for T {}

pub struct CliSession {
    stream: Box<dyn ShellStream>,
    buffer: Vec<u8>,
    prompt: String,
    read_timeout: Duration,
}

impl CliSession {
    /// Waits for the login prompt, enters privileged mode and turns paging off.
    pub async fn start(
        stream: Box<dyn ShellStream>,
        enable_secret: &str,
        read_timeout: Duration,
    ) -> Result<CliSession> {
        let mut cli = CliSession {
            stream,
            buffer: Vec::new(),
            prompt: String::new(),
            read_timeout,
        };
        cli.read_until(|text| is_prompt(last_line(text))).await?;
        cli.settle().await?;
        cli.find_prompt().await?;
        cli.enable(enable_secret).await?;
        for command in SETUP_COMMANDS {
            cli.send_command(command).await?;
        }
        Ok(cli)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Runs `command` and returns its output without the echoed command and the
    /// trailing prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<String> {
        debug!("Sending command '{}'", command);
        self.write_line(command).await?;
        let prompt = self.prompt.clone();
        let raw = self.read_until(|text| last_line(text) == prompt).await?;
        Ok(clean_output(&raw, command, &prompt))
    }

    pub async fn close(&mut self) -> Result<()> {
        if let Err(err) = self.write_line("exit").await {
            debug!("Could not send exit: {}", err);
        }
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Discards output until the device has been quiet for [`QUIET_PERIOD`]. A banner
    /// line ending in `>` or `#` is not taken for the prompt this way.
    async fn settle(&mut self) -> Result<()> {
        let limit = self.read_timeout;
        let stream = &mut self.stream;
        let drain = async move {
            let mut chunk = [0u8; 4096];
            loop {
                match timeout(QUIET_PERIOD, stream.read(&mut chunk)).await {
                    Err(_) => return Ok(()),
                    Ok(Ok(0)) => return Err(Error::ChannelClosed),
                    Ok(Ok(read)) => trace!("< {}", String::from_utf8_lossy(&chunk[..read])),
                    Ok(Err(err)) => return Err(Error::from(err)),
                }
            }
        };
        timeout(limit, drain)
            .await
            .map_err(|_| Error::Timeout(limit.as_secs()))?
    }

    async fn find_prompt(&mut self) -> Result<()> {
        self.write_line("").await?;
        let text = self.read_until(|text| is_prompt(last_line(text))).await?;
        self.prompt = last_line(&text).to_string();
        debug!("Detected prompt '{}'", self.prompt);
        Ok(())
    }

    async fn enable(&mut self, secret: &str) -> Result<()> {
        if self.prompt.ends_with('#') {
            return Ok(());
        }
        self.write_line("enable").await?;
        let text = self
            .read_until(|text| {
                let line = last_line(text);
                is_password_prompt(line) || is_prompt(line)
            })
            .await?;
        if is_password_prompt(last_line(&text)) {
            self.write_secret(secret).await?;
            self.read_until(|text| is_prompt(last_line(text))).await?;
        }
        self.find_prompt().await?;
        if self.prompt.ends_with('#') {
            Ok(())
        } else {
            warn!("Enable rejected, still at '{}'", self.prompt);
            Err(Error::Privilege(self.prompt.clone()))
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        trace!("> {}", line);
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn write_secret(&mut self, secret: &str) -> Result<()> {
        self.stream.write_all(secret.as_bytes()).await?;
        self.stream.write_all(b"\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Reads until `done` accepts everything received so far, then hands it out.
    async fn read_until<F>(&mut self, done: F) -> Result<String>
    where
        F: Fn(&str) -> bool,
    {
        let mut chunk = [0u8; 4096];
        loop {
            let text = String::from_utf8_lossy(&self.buffer).replace('\r', "");
            if done(&text) {
                self.buffer.clear();
                trace!("< {}", text);
                return Ok(text);
            }
            let read = timeout(self.read_timeout, self.stream.read(&mut chunk))
                .await
                .map_err(|_| Error::Timeout(self.read_timeout.as_secs()))??;
            if read == 0 {
                return Err(Error::ChannelClosed);
            }
            self.buffer.extend_from_slice(&chunk[..read]);
        }
    }
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}

fn is_prompt(line: &str) -> bool {
    line.len() > 1 && (line.ends_with('#') || line.ends_with('>'))
}

fn is_password_prompt(line: &str) -> bool {
    line.to_ascii_lowercase().ends_with("password:")
}

fn clean_output(raw: &str, command: &str, prompt: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    if lines.last().is_some_and(|line| line.trim() == prompt) {
        lines.pop();
    }
    while lines.first().is_some_and(|line| line.trim().is_empty()) {
        lines.remove(0);
    }
    if lines
        .first()
        .is_some_and(|line| line.trim_end().ends_with(command))
    {
        lines.remove(0);
    }
    lines.join("\n")
}
