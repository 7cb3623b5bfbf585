use crate::commands::builtin::{builtin, builtin_exec};
use crate::config::Config;
use crate::connector::SshConnector;
use crate::device::{DeviceSession, DEFAULT_BASELINE, DEFAULT_DIFF_REPORT};
use crate::error::{Error, Result};
use clap::{
    arg, crate_authors, crate_description, crate_name, crate_version, value_parser, Arg, Command,
    ValueHint,
};
use log::{debug, error, info};
use std::path::PathBuf;
use std::time::Instant;

pub async fn exec(cmd: &str, cfg: Config) -> Result<()> {
    let host = cfg.target.address().to_string();
    let start_time = Instant::now();
    let mut session = DeviceSession::new(
        cfg.target.clone(),
        cfg.options.clone(),
        Box::new(SshConnector),
    );

    let result = match builtin_exec(cmd, &mut session, &cfg).await {
        Some(result) => result,
        None => Err(Error::Config(format!("Unknown command '{}'", cmd))),
    };
    if let Err(err) = session.close().await {
        debug!(target: &host, "Session close reported: {}", err);
    }

    match &result {
        Ok(_) => {
            info!(target: &host, "Operation took: {:.3}s", start_time.elapsed().as_secs_f32())
        }
        Err(err) => error!(target: &host, "Command '{}' failed: {}", cmd, err),
    }
    result
}

pub fn cli() -> Command {
    Command::new(crate_name!())
        .author(crate_authors!("\n"))
        .about(crate_description!())
        .version(crate_version!())
        .long_version(crate_version!())
        .arg_required_else_help(true)
        .allow_external_subcommands(false)
        .bin_name("netconf-rollback")
        .display_name("netconf-rollback")
        .help_template(color_print::cstr!(
            "\
{about-with-newline}
<green,bold>Author:</> {author}

<green,bold>Usage:</> {usage}

<green,bold>Options:</>
{options}

<green,bold>Commands:</>
    <cyan,bold>export</>            Save running configuration to the baseline file
    <cyan,bold>apply</>             Apply a configuration file and write a diff report
    <cyan,bold>restore</>           Restore a saved configuration (baseline by default)
    <cyan,bold>show-run</>          Print the running configuration from the command line
    <cyan,bold>run</>               Export baseline, apply a file, restore baseline

See '<cyan,bold>netconf-rollback help</> <cyan><<command>></>' for more information on a specific command.\n",
        ))
        .args([
            arg!(-v --verbose ... "Use verbose output (-vv to log all rpc replies, -vvv to log framed traffic)")
                .global(true),
            arg!(-q --quiet "Disable logging completely")
                .global(true),
            global_opt("host", "Device address, host[:netconf-port]")
                .env("NETCONF_HOST"),
            global_opt("username", "Username for both connections")
                .env("NETCONF_USERNAME"),
            global_opt("password", "Password for both connections")
                .env("NETCONF_PASSWORD")
                .hide_env_values(true),
            global_opt("secret", "Enable secret [default: password]")
                .env("NETCONF_ENABLE_SECRET")
                .hide_env_values(true),
            global_opt("ssh-port", "SSH port of the command line")
                .default_value("22")
                .value_parser(value_parser!(u16)),
            global_opt("platform", "Capability profile sent in hello")
                .default_value("iosxe")
                .value_parser(["iosxe", "default"]),
            global_opt("target", "Datastore receiving edit-config")
                .default_value("candidate")
                .value_parser(["candidate", "running"]),
            global_opt("with-defaults", "With-defaults mode for export")
                .env("NETCONF_WITH_DEFAULTS")
                .value_parser(["report-all", "report-all-tagged", "trim", "explicit"]),
            global_opt("baseline", "Baseline export file")
                .default_value(DEFAULT_BASELINE)
                .value_hint(ValueHint::FilePath)
                .value_parser(value_parser!(PathBuf)),
            global_opt("diff-report", "HTML diff report file")
                .default_value(DEFAULT_DIFF_REPORT)
                .value_hint(ValueHint::FilePath)
                .value_parser(value_parser!(PathBuf)),
            global_opt("timeout", "Command-line read timeout in seconds")
                .default_value("30")
                .value_parser(value_parser!(u64)),
        ])
        .subcommands(builtin())
}

fn global_opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).help(help).long(name).global(true)
}

#[test]
fn verify_cli() {
    cli().debug_assert();
}
