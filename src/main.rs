mod app;
mod archive;
mod backup;
mod cli;
mod config;
mod conflicts;
mod deploy;
mod fallout76;
mod importer;
mod ini;
mod library;
mod logging;
mod metadata;
mod plugins;
mod status;
mod tweaks;
mod walk;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
