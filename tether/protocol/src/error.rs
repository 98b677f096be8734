use thiserror::Error;

use crate::memory::Address;

/// Errors seen by the host side when talking to a session data block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("tether-protocol: expected tag `{expected}` at {address:#010x}, found `{found}`!")]
    TagMismatch {
        address: Address,
        expected: String,
        found: String,
    },

    #[error("tether-protocol: session layout has no command channel!")]
    NoCommandChannel,

    #[error("tether-protocol: unknown request code `{0}`!")]
    UnknownRequest(u32),
}

/// Renders a 4 byte tag the way it shows up in a memory dump (`"rxq"`), dropping the padding.
pub(crate) fn display_tag(tag: &[u8; 4]) -> String {
    tag.iter()
        .take_while(|byte| **byte != 0)
        .map(|byte| char::from(*byte))
        .collect()
}
