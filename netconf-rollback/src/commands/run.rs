use crate::commands::builtin::{file_arg, value_of};
use crate::config::Config;
use crate::device::DeviceSession;
use crate::error::Result;
use clap::Command;
use log::info;
use std::path::PathBuf;

pub fn cli() -> Command {
    Command::new("run")
        .about("Export the baseline, apply a file, then restore the baseline")
        .help_template(color_print::cstr!(
            "\
{about-with-newline}
<green,bold>Usage:</> {usage}

<green,bold>Arguments:</>
{positionals}

<green,bold>Options:</>
{options}\n",
        ))
        .arg(file_arg("file", "XML document to apply before rolling back", true))
}

/// The full change window: baseline, change with diff report, rollback.
pub async fn exec(cfg: &Config, session: &mut DeviceSession) -> Result<()> {
    let file = value_of::<PathBuf>("file", &cfg.args);
    session.open_mgmt().await?;
    let baseline = session.export_config().await?;
    info!(target: session.host(), "Baseline saved to '{}'", baseline.display());

    let report = session.apply_config(file).await?;
    info!(
        target: session.host(),
        "Applied '{}': {} line(s) added, {} line(s) removed, report in '{}'",
        file.display(),
        report.added,
        report.removed,
        report.diff_report.display()
    );

    session.restore_config(&baseline).await?;
    info!(target: session.host(), "Rolled back to '{}'", baseline.display());
    Ok(())
}
