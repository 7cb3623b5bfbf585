use crate::commands::builtin::{file_arg, value_of};
use crate::config::Config;
use crate::device::DeviceSession;
use crate::error::Result;
use clap::Command;
use log::{info, warn};
use std::path::PathBuf;

pub fn cli() -> Command {
    Command::new("apply")
        .about("Replace the configuration with an XML file and write a diff report")
        .help_template(color_print::cstr!(
            "\
{about-with-newline}
<green,bold>Usage:</> {usage}

<green,bold>Arguments:</>
{positionals}

<green,bold>Options:</>
{options}\n",
        ))
        .arg(file_arg("file", "XML document with the new configuration", true))
}

pub async fn exec(cfg: &Config, session: &mut DeviceSession) -> Result<()> {
    let file = value_of::<PathBuf>("file", &cfg.args);
    session.open_mgmt().await?;
    let report = session.apply_config(file).await?;
    if !report.has_changes() {
        warn!(target: session.host(), "Running configuration did not change");
    }
    info!(
        target: session.host(),
        "{} line(s) added, {} line(s) removed, report in '{}'",
        report.added,
        report.removed,
        report.diff_report.display()
    );
    Ok(())
}
