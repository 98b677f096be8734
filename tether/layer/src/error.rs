use tether_config::config::ConfigError;
use tether_protocol::Address;
use thiserror::Error;

use crate::socket::HandlerId;

/// Errors raised while setting the layer up. Handlers never fail, see
/// [`Bypass`](crate::detour::Bypass).
#[derive(Error, Debug)]
pub enum LayerError {
    #[error("tether-layer: Failed setting up tether with configuration error `{0}`!")]
    Config(#[from] ConfigError),

    #[error("tether-layer: IO failed with `{0}`!")]
    IO(#[from] std::io::Error),

    #[error("tether-layer: Invalid patch codes: {0}")]
    PatchCode(#[from] PatchCodeError),

    #[error(
        "tether-layer: Trampoline {target:#010x} for `{handler}` (called from {site:#010x}) \
        can't be encoded in a call instruction!"
    )]
    CallTargetOutOfRange {
        site: Address,
        handler: HandlerId,
        target: Address,
    },

    #[error(
        "tether-layer: Session data block at {base:#010x} ({size} bytes) runs past the end of \
        the address space!"
    )]
    DataBlockOutOfRange { base: Address, size: u32 },

    #[error(
        "tether-layer: Trampolines at {base:#010x} ({size} bytes) run past the end of the \
        address space!"
    )]
    TrampolinesOutOfRange { base: Address, size: u32 },

    #[error("tether-layer: Patch address {0:#010x} is not aligned to its width!")]
    UnalignedPatch(Address),

    #[error(
        "tether-layer: Trampolines {trampolines_start:#010x}..{trampolines_end:#010x} overlap \
        the session data block {data_start:#010x}..{data_end:#010x}!"
    )]
    Overlap {
        trampolines_start: Address,
        trampolines_end: Address,
        data_start: Address,
        data_end: Address,
    },
}

pub type Result<T, E = LayerError> = std::result::Result<T, E>;

/// A line in a patch-code file that could not be understood.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchCodeError {
    #[error("line {line}: invalid size `{value}`, expected 8, 16 or 32")]
    InvalidSize { line: usize, value: String },

    #[error("line {line}: invalid {field} `{value}`")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },
}
