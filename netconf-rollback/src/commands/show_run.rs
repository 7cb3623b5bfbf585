use crate::config::Config;
use crate::device::DeviceSession;
use crate::error::Result;
use clap::Command;

pub fn cli() -> Command {
    Command::new("show-run")
        .about("Print 'show running-config' from the command line")
        .help_template(color_print::cstr!(
            "\
{about-with-newline}
<green,bold>Usage:</> {usage}

<green,bold>Options:</>
{options}\n",
        ))
}

pub async fn exec(_cfg: &Config, session: &mut DeviceSession) -> Result<()> {
    session.open_cli().await?;
    for line in session.snapshot_running().await? {
        println!("{}", line);
    }
    Ok(())
}
