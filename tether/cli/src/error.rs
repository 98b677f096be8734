use std::path::PathBuf;

use miette::Diagnostic;
use tether_config::config::ConfigError;
use tether_layer::{LayerError, PatchCodeError};
use thiserror::Error;

pub(crate) type CliResult<T, E = CliError> = core::result::Result<T, E>;

#[derive(Debug, Error, Diagnostic)]
pub(crate) enum CliError {
    #[error("Failed to load the layer configuration: {0}")]
    #[diagnostic(help(
        "Check the file passed with `--config` (or `TETHER_CONFIG_FILE`) and the `TETHER_*` \
        environment variables."
    ))]
    Config(#[from] ConfigError),

    #[error("The configured layer can't be set up: {0}")]
    #[diagnostic(help(
        "`data_base` and `trampoline_base` must not overlap, and trampolines must sit below \
        0x10000000 so call instructions can reach them."
    ))]
    Layer(#[from] LayerError),

    #[error("Failed to read `{0}`: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to write `{0}`: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Invalid patch code in `{0}`: {1}")]
    #[diagnostic(help("Each line is `size, address, original, changed`, with size 8, 16 or 32."))]
    PatchCode(PathBuf, PatchCodeError),

    #[error("Failed to serialize the layout: {0}")]
    Json(#[from] serde_json::Error),
}
