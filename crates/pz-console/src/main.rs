//! PolyZones console
//!
//! This binary:
//! 1. Opens (or bootstraps) the zone store in `POLYZONES_DIR`
//! 2. Reads one command per line from stdin
//! 3. Applies each command to the registry and prints the result
//!
//! Type `help` for the command list.

mod command;

use std::io::{self, BufRead, Write};

use pz_registry::{RegistryConfig, ZoneRegistry};
use tracing::info;

use crate::command::{Console, Flow};

fn main() -> eyre::Result<()> {
    // Logs go to stderr so command output can be piped.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pz_console=info".parse()?)
                .add_directive("pz_registry=info".parse()?),
        )
        .init();

    let registry = ZoneRegistry::from_config(RegistryConfig::from_env())?;
    info!(
        "{} zones loaded from {}",
        registry.zone_count(),
        registry.config().data_dir.display()
    );

    let mut console = Console::new(registry);
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    prompt(&mut stdout)?;
    for line in stdin.lock().lines() {
        if console.run_line(&line?, &mut stdout)? == Flow::Quit {
            break;
        }
        prompt(&mut stdout)?;
    }

    info!("Shutting down");
    Ok(())
}

fn prompt(out: &mut impl Write) -> io::Result<()> {
    write!(out, "> ")?;
    out.flush()
}
