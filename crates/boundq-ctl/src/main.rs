//! boundq-ctl — command-line sender, receiver, and admin for boundq queues.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use boundq::{Namespace, QueueError};
use boundq_core::config::BoundqConfig;

mod cmd;

use cmd::Settings;

// ── Argument parsing ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Flags {
    pub root: Option<PathBuf>,
    pub name: Option<String>,
    pub capacity: Option<usize>,
    pub max_size: Option<usize>,
    pub priority: Option<u32>,
    pub message: Option<String>,
    pub timeout_ms: Option<u64>,
    pub keep: bool,
}

fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{flag} requires a value"))
}

fn parse_args(args: &[String]) -> Result<(Flags, Vec<&str>)> {
    let mut flags = Flags::default();
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--root" => flags.root = Some(PathBuf::from(value(args, &mut i, "--root")?)),
            "--name" => flags.name = Some(value(args, &mut i, "--name")?.to_string()),
            "--capacity" => {
                flags.capacity = Some(
                    value(args, &mut i, "--capacity")?
                        .parse()
                        .context("--capacity must be a number")?,
                )
            }
            "--max-size" => {
                flags.max_size = Some(
                    value(args, &mut i, "--max-size")?
                        .parse()
                        .context("--max-size must be a number")?,
                )
            }
            "--priority" => {
                flags.priority = Some(
                    value(args, &mut i, "--priority")?
                        .parse()
                        .context("--priority must be a non-negative number")?,
                )
            }
            "--message" => flags.message = Some(value(args, &mut i, "--message")?.to_string()),
            "--timeout-ms" => {
                flags.timeout_ms = Some(
                    value(args, &mut i, "--timeout-ms")?
                        .parse()
                        .context("--timeout-ms must be a number")?,
                )
            }
            "--keep" => flags.keep = true,
            other => remaining.push(other),
        }
        i += 1;
    }
    Ok((flags, remaining))
}

fn print_usage() {
    println!("Usage: boundq-ctl [--root <dir>] <command> [options]");
    println!();
    println!("Commands:");
    println!("  send     Send one message, creating the queue if needed");
    println!("  recv     Wait for one message, print it, and delete the queue");
    println!("  create   Create a queue");
    println!("  stat     Show queue attributes and counters");
    println!("  list     List queues in the namespace");
    println!("  delete   Delete a queue");
    println!("  config init  Write the default config file if missing");
    println!();
    println!("Options:");
    println!("  --root <dir>        Namespace directory (default: from config)");
    println!("  --name <name>       Queue name, e.g. /jobs (default: from config)");
    println!("  --capacity <n>      Capacity when creating");
    println!("  --max-size <bytes>  Max message size when creating");
    println!("  --priority <n>      Priority for send");
    println!("  --message <text>    Message for send (default: read one line from stdin)");
    println!("  --timeout-ms <ms>   Give up recv after this long");
    println!("  --keep              Do not delete the queue after recv");
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (flags, remaining) = parse_args(&args)?;

    if matches!(remaining.as_slice(), [] | ["help"] | ["--help"] | ["-h"]) {
        print_usage();
        return Ok(());
    }
    if matches!(remaining.as_slice(), ["config", "init"]) {
        return cmd::config::cmd_config_init();
    }

    let config = BoundqConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        BoundqConfig::default()
    });
    let mut ns_config = config.namespace.clone();
    if let Some(root) = &flags.root {
        ns_config.root = root.clone();
    }
    let ns = Namespace::from_config(&ns_config).with_context(|| {
        format!("failed to open namespace {}", ns_config.root.display())
    })?;
    let settings = Settings::resolve(&config.queue, &flags);
    tracing::debug!(root = %ns.root().display(), queue = %settings.name, "boundq-ctl starting");

    match remaining.as_slice() {
        ["send"] => cmd::send::cmd_send(&ns, &settings, flags.message),
        ["recv"] | ["receive"] => cmd::recv::cmd_recv(
            &ns,
            &settings,
            flags.keep,
            flags.timeout_ms.map(Duration::from_millis),
        ),
        ["create"] => cmd::queue::cmd_create(&ns, &settings),
        ["stat"] => cmd::queue::cmd_stat(&ns, &settings.name),
        ["list"] | ["ls"] => cmd::queue::cmd_list(&ns),
        ["delete"] | ["rm"] => cmd::queue::cmd_delete(&ns, &settings.name),
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            bail!("unknown command");
        }
    }
}

/// Queue errors lead with their kind so scripts can match on it.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<QueueError>() {
        Some(queue_err) => eprintln!("error: {}: {:#}", queue_err.kind(), err),
        None => eprintln!("error: {:#}", err),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}
