use crate::commands::builtin::{file_arg, value_of_if_exists};
use crate::config::Config;
use crate::device::DeviceSession;
use crate::error::Result;
use clap::Command;
use log::info;
use std::path::PathBuf;

pub fn cli() -> Command {
    Command::new("restore")
        .about("Push a saved configuration back, the baseline file by default")
        .help_template(color_print::cstr!(
            "\
{about-with-newline}
<green,bold>Usage:</> {usage}

<green,bold>Arguments:</>
{positionals}

<green,bold>Options:</>
{options}\n",
        ))
        .arg(file_arg("file", "XML document to restore [default: --baseline]", false))
}

pub async fn exec(cfg: &Config, session: &mut DeviceSession) -> Result<()> {
    let file = value_of_if_exists::<PathBuf>("file", &cfg.args)
        .cloned()
        .unwrap_or_else(|| cfg.options.artifacts.baseline.clone());
    session.open_mgmt().await?;
    session.restore_config(&file).await?;
    info!(target: session.host(), "Configuration restored from '{}'", file.display());
    Ok(())
}
