use crate::config::Config;
use crate::device::DeviceSession;
use crate::error::Result;
use clap::Command;
use log::info;

pub fn cli() -> Command {
    Command::new("export")
        .about("Save the running configuration as XML to the baseline file")
        .help_template(color_print::cstr!(
            "\
{about-with-newline}
<green,bold>Usage:</> {usage}

<green,bold>Options:</>
{options}\n",
        ))
}

pub async fn exec(_cfg: &Config, session: &mut DeviceSession) -> Result<()> {
    session.open_mgmt().await?;
    let path = session.export_config().await?;
    info!(target: session.host(), "Baseline saved to '{}'", path.display());
    Ok(())
}
