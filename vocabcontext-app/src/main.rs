mod api;
mod cli;
mod logging;
mod tui;

use anyhow::Result;
use clap::Parser; // needed for Cli::parse()
use std::sync::Arc;
use tokio::runtime::Runtime;

use cli::commands::{open_store, run_cli};
use cli::opts::{Cli, Command};
use tui::app::TuiApp;

fn main() -> Result<()> {
    let args = Cli::parse();

    match &args.cmd {
        // Run TUI on its own runtime (no nested Tokio); log output would
        // tear the alternate screen, so it stays off here.
        Command::Tui(q) => {
            logging::init_tracing("off");
            let rt = Arc::new(Runtime::new()?);
            let store = rt.block_on(open_store(&args))?;
            let mut app = TuiApp::new(store, rt, q.limit);
            app.run()
        }
        _ => {
            logging::init_tracing(&args.log_level);
            let rt = Runtime::new()?;
            rt.block_on(run_cli(args))
        }
    }
}
