//! 🚀 bkx-cli: the front door, the bouncer, the maitre d' of bkx.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that parses args, loads config,
//! sets up logging, asks the one scary question, and then lets the library do
//! the heavy lifting. Like a manager. 🦆

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use bkx::{AlwaysConfirm, Confirm, RunOutcome};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🪣 Migrate every object in a list of storage buckets from one project to another.
///
/// Credentials come from BKX_SOURCE__SERVICE_KEY and BKX_DESTINATION__SERVICE_KEY.
#[derive(Debug, Parser)]
#[command(name = "bkx", version)]
struct Cli {
    /// TOML config file, merged over BKX_* environment variables.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    yes: bool,

    /// Buckets to migrate, in order. Replaces the configured list.
    buckets: Vec<String>,
}

/// 🙋 Asks on stdout, reads one line from stdin. Only a literal "yes" counts.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{} (yes/no): ", prompt)?;
        stdout.flush()?;

        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("💀 Could not read the confirmation answer from stdin")?;
        Ok(answer.trim().eq_ignore_ascii_case("yes"))
    }
}

/// 🚀 main(): where it all begins. The "I pressed Enter and held my breath" moment.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Parse args
/// 3. Load config (the moment of truth)
/// 4. Run the thing, print the scoreboard
/// 5. Exit 1 if anything failed (cry)
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(outcome) => {
            if let RunOutcome::Completed(report) = &outcome {
                println!("{}", bkx::progress::summary_table(report));
                if !report.total.is_clean() {
                    error!(
                        "💀 {} object(s) failed to migrate. Check the warnings above.",
                        report.total.failed
                    );
                }
            }
            std::process::exit(outcome.exit_code());
        }
        Err(err) => {
            report_error(&err);
            // 🗑️ Exit with prejudice. Process exitus maximus.
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<RunOutcome> {
    // 🔒 Validate the config file exists before we get too emotionally attached
    if let Some(path) = &cli.config {
        let exists = path.try_exists().with_context(|| {
            format!(
                "💀 Couldn't check whether the configuration file exists. Maybe it's a pwd/cwd thing \
                 with relative paths; an absolute path removes all doubt. Was checking here: '{}'",
                path.display()
            )
        })?;
        if !exists {
            anyhow::bail!(
                "💀 Configuration file '{}' does not exist. Double check the path.",
                path.display()
            );
        }
    }

    let mut config = bkx::app_config::load_config(cli.config.as_deref())
        .context("💀 In bkx-cli, main, we couldn't load the configuration. Take a look at the file and the BKX_* variables")?;
    if !cli.buckets.is_empty() {
        config.buckets = cli.buckets;
    }

    if cli.yes {
        bkx::run(config, &AlwaysConfirm).await
    } else {
        bkx::run(config, &StdinConfirm).await
    }
}

/// 🧅 Peels the error chain one layer at a time, and adds a hint if it smells like the network.
fn report_error(err: &anyhow::Error) {
    error!("💀 error: {}", err);
    let mut the_vibes_are_giving_connection_issues = false;
    for cause in err.chain().skip(1) {
        error!("⚠️  cause: {}", cause);
        let cause_str = cause.to_string();
        if cause_str.contains("error sending request")
            || cause_str.contains("connection refused")
            || cause_str.contains("Connection refused")
            || cause_str.contains("tcp connect error")
            || cause_str.contains("dns error")
        {
            the_vibes_are_giving_connection_issues = true;
        }
    }

    // -- 📡 if it smells like a connection problem, it's probably a connection problem
    if the_vibes_are_giving_connection_issues {
        error!(
            "🔧 hint: looks like a project isn't reachable. Double-check the source and \
             destination URLs (scheme included) and that your network can reach them. ☕"
        );
    }
}
