use crate::commands::*;
use crate::config::Config;
use crate::device::DeviceSession;
use crate::error::Result;
use clap::builder::{IntoResettable, ValueParser};
use clap::{Arg, ArgMatches, Command, ValueHint};
use std::path::PathBuf;

pub fn builtin() -> Vec<Command> {
    vec![
        export::cli(),
        apply::cli(),
        restore::cli(),
        show_run::cli(),
        run::cli(),
    ]
}

pub async fn builtin_exec(
    cmd: &str,
    session: &mut DeviceSession,
    cfg: &Config,
) -> Option<Result<()>> {
    let f = match cmd {
        "export" => export::exec(cfg, session).await,
        "apply" => apply::exec(cfg, session).await,
        "restore" => restore::exec(cfg, session).await,
        "show-run" => show_run::exec(cfg, session).await,
        "run" => run::exec(cfg, session).await,
        _ => return None,
    };
    Some(f)
}

/// Only for arguments that are required or carry a default value.
pub(crate) fn value_of<'a, T: Clone + Send + Sync + 'static>(
    name: &str,
    args: &'a ArgMatches,
) -> &'a T {
    args.get_one::<T>(name)
        .unwrap_or_else(|| panic!("argument '{}' has no value or default", name))
}

pub(crate) fn value_of_if_exists<'a, T: Clone + Send + Sync + 'static>(
    name: &str,
    args: &'a ArgMatches,
) -> Option<&'a T> {
    if args.contains_id(name) {
        args.get_one::<T>(name)
    } else {
        None
    }
}

/// Positional path argument.
pub(super) fn file_arg(name: &'static str, help: &'static str, required: bool) -> Arg {
    Arg::new(name)
        .help(help)
        .required(required)
        .value_hint(ValueHint::FilePath)
        .value_parser(clap::value_parser!(PathBuf))
}

pub(crate) fn arg(
    name: &'static str,
    help: &'static str,
    required: bool,
    short: Option<char>,
    default: Option<&'static str>,
    hint: Option<ValueHint>,
    parser: impl IntoResettable<ValueParser>,
) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .help(help)
        .required(required)
        .default_value(default)
        .value_hint(hint)
        .value_parser(parser)
}
