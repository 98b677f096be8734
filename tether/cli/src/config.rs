use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};
use tether_layer::patch::pnach::DEFAULT_TITLE;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Offline tooling for the tether layer: patch tables, pnach files and the shared \
    data block layout."
)]
pub(super) struct Cli {
    #[command(subcommand)]
    pub(super) commands: Commands,
}

#[derive(Debug, Subcommand)]
pub(super) enum Commands {
    /// Render the patch table of the configured target as a PCSX2 pnach file.
    Pnach(PnachArgs),

    /// Print where the command channel, the queues and the trampolines live.
    Layout(LayoutArgs),

    /// Parse a patch-code file and print the codes it contains.
    Codes(CodesArgs),
}

/// Arguments shared by the commands that need a resolved layer configuration.
#[derive(Debug, Args)]
pub(super) struct ConfigArgs {
    /// Layer config file (`.toml` or `.json`). Falls back to `TETHER_CONFIG_FILE`.
    #[arg(short = 'f', long, value_hint = ValueHint::FilePath)]
    pub(super) config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub(super) struct PnachArgs {
    #[command(flatten)]
    pub(super) config: ConfigArgs,

    /// `gametitle=` header line.
    #[arg(long, default_value = DEFAULT_TITLE)]
    pub(super) title: String,

    /// Write the file here instead of stdout.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub(super) output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub(super) struct LayoutArgs {
    #[command(flatten)]
    pub(super) config: ConfigArgs,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub(super) json: bool,
}

#[derive(Debug, Args)]
pub(super) struct CodesArgs {
    /// Patch-code file, one `size, address, original, changed` per line.
    #[arg(value_hint = ValueHint::FilePath)]
    pub(super) path: PathBuf,
}
