use crate::commands::builtin::value_of;
use config::Config;
use env_logger::{Builder, Target};
use log::{error, LevelFilter};
use std::process::ExitCode;

mod cli;
mod commands;
mod config;
mod connector;
mod device;
mod diff;
mod error;
mod shell;
#[cfg(test)]
mod testing;

fn init_logging(verbosity: &u8) {
    let mut builder = Builder::new();
    match verbosity {
        1 => {
            builder.filter_level(LevelFilter::Debug);
            builder.filter_module("netconf_client", LevelFilter::Info)
        }
        2 => {
            builder.filter_level(LevelFilter::Debug);
            builder.filter_module("netconf_client::framer::async_framer", LevelFilter::Off);
            builder.filter_module("netconf_client::connection", LevelFilter::Debug)
        }
        3 => {
            builder.filter_level(LevelFilter::Trace);
            builder.filter_module("netconf_client", LevelFilter::Trace)
        }
        _ => {
            builder.filter_level(LevelFilter::Info);
            builder.filter_module("netconf_client", LevelFilter::Warn)
        }
    };
    builder.target(Target::Stdout);
    builder.init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = cli::cli().get_matches();
    let verbosity = value_of::<u8>("verbose", &args);
    let disable_logging = value_of::<bool>("quiet", &args);
    if !disable_logging {
        init_logging(verbosity);
    }

    match args.remove_subcommand() {
        Some((cmd, args)) => {
            let cfg = match Config::new(args) {
                Ok(cfg) => cfg,
                Err(err) => {
                    error!("{}", err);
                    return ExitCode::FAILURE;
                }
            };
            match cli::exec(&cmd, cfg).await {
                Ok(_) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            }
        }
        _ => {
            let _ = cli::cli().print_help();
            ExitCode::FAILURE
        }
    }
}
