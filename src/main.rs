use std::io::{self, Write};
use std::process::ExitCode;

use clap::{CommandFactory, FromArgMatches, Parser};

mod cmd;
mod rpc;
mod utils;

use cmd::format::{Role, StyleOptions, box_header, color, emoji};
use cmd::{CallArgs, UsageError};
use rpc::RpcError;

/// Dashboard Client - call Bugzilla Dashboard actions over XML-RPC
///
/// Usage:
///   dashboard-client [OPTIONS] <ACTION> [KEY=VALUE]...
///
/// Each KEY=VALUE is checked against the action's parameter list (unknown
/// keys, wrong types and missing required keys are rejected before any
/// request is sent), then `Dashboard.<ACTION>` is called with the resulting
/// struct plus `Bugzilla_login` / `Bugzilla_password`.
///
/// Exit status: 0 on success, 1 on usage errors, server faults, and
/// transport failures.
///
/// Examples:
///   dashboard-client --username me@example.org --password secret get_overlays
///   dashboard-client --format shell load_overlay overlay_user_id=1 overlay_id=3
///   eval "$(dashboard-client --format shell get_preferences)"
#[derive(Parser, Debug)]
#[command(
    name = "dashboard-client",
    version,
    author,
    about = "Dashboard Client - call Bugzilla Dashboard actions over XML-RPC"
)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Don't print the operation result (errors are still reported)
    #[arg(short, long)]
    quiet: bool,

    #[command(flatten)]
    call: CallArgs,
}

fn command() -> clap::Command {
    Cli::command().after_help(cmd::actions::catalog("dashboard-client"))
}

fn main() -> ExitCode {
    let matches = command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    utils::init_logging(utils::derive_level(cli.verbose, cli.quiet));

    match cmd::execute_call(cli.call, cli.quiet) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err, &mut io::stdout(), &mut io::stderr(), &StyleOptions::detect()),
    }
}

/// Print `err` the way its kind calls for and pick the exit status.
/// Faults go to `out`; usage and transport errors go to `err_out`.
fn report<O, E>(err: &anyhow::Error, out: &mut O, err_out: &mut E, style: &StyleOptions) -> ExitCode
where
    O: Write,
    E: Write,
{
    let written = if let Some(usage) = err.downcast_ref::<UsageError>() {
        write_usage(err_out, usage)
    } else if let Some(RpcError::Fault { code, message }) = err.downcast_ref::<RpcError>() {
        tracing::debug!(code, "server returned a fault");
        // faults are part of the normal output stream
        writeln!(out, "{message}\n").and_then(|()| out.flush())
    } else {
        let title = format!("{} Call Error", emoji("error", style));
        let subtitle = color(Role::Error, format!("{err:#}"), style);
        writeln!(err_out, "{}", box_header(title, Some(subtitle), style))
    };
    if let Err(e) = written {
        tracing::debug!(error = %e, "failed to report error");
    }
    ExitCode::FAILURE
}

fn write_usage<W: Write>(w: &mut W, usage: &UsageError) -> io::Result<()> {
    let help = command().render_help();
    writeln!(w, "{help}")?;
    writeln!(w)?;
    writeln!(w, "ERROR: {usage}")
}
