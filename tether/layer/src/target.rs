//! Per-build tables: which call sites to redirect, which words to override, and the return
//! conventions the surrounding application code expects from the handlers.

use tether_config::{EmptySentinel, TargetVariant};
use tether_protocol::Address;

use crate::{
    patch::{CallSite, DataPatch, PatchTable},
    socket::{HandlerId, WOULD_BLOCK},
};

/// Sentinels the application tests for when there is nothing to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conventions {
    /// Best-effort receive with an empty inbound queue.
    pub best_effort_empty: u32,
    /// First word of the status record when the inbound queue is empty.
    pub status_empty: u32,
}

impl Conventions {
    pub fn with_best_effort_empty(self, sentinel: EmptySentinel) -> Self {
        let best_effort_empty = match sentinel {
            EmptySentinel::Zero => 0,
            EmptySentinel::WouldBlock => WOULD_BLOCK,
        };

        Self {
            best_effort_empty,
            ..self
        }
    }
}

const OPEN_SITE: Address = 0x0038_1da4;
const CLOSE_SITE: Address = 0x0038_2024;
const SEND_SITE: Address = 0x0038_1fb4;
const RECV_SITE: Address = 0x0038_1f7c;
const RECEIVE_AVAILABLE_SITE: Address = 0x0037_fd2c;
const GET_STATUS_SITE: Address = 0x0035_7e34;
const RESET_SITE: Address = 0x0035_a174;
const RESOLVE_BEGIN_SITE: Address = 0x0035_9e04;
const RESOLVE_RESULT_SITE: Address = 0x0035_9e78;
const RESOLVE_RELEASE_SITES: [Address; 2] = [0x0035_9ea4, 0x0035_9ec4];

/// Replaces modem recognition with network battle.
const NETWORK_BATTLE_PATCH: DataPatch = DataPatch::word(0x003c_4f58, 0x0015_f110);

/// Skips PPP dialing.
const SKIP_DIAL_PATCH: DataPatch = DataPatch::word(0x0035_a660, 0x2403_0002);

/// Everything that differs between builds of the instrumented application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProfile {
    pub variant: TargetVariant,
    /// Whether the socket lifecycle goes through the command channel.
    pub command_channel: bool,
    pub conventions: Conventions,
    pub table: PatchTable,
}

impl TargetProfile {
    pub fn for_variant(variant: TargetVariant) -> Self {
        match variant {
            TargetVariant::Ps2Minimal => Self::ps2_minimal(),
            TargetVariant::Ps2Rpc => Self::ps2_rpc(),
        }
    }

    /// Data calls only. The application keeps driving open/close and name resolution itself.
    fn ps2_minimal() -> Self {
        let calls = vec![
            CallSite::new(SEND_SITE, HandlerId::TcpSend),
            CallSite::new(RECV_SITE, HandlerId::TcpRecv),
            CallSite::new(RECEIVE_AVAILABLE_SITE, HandlerId::ReceiveAvailable),
            CallSite::new(GET_STATUS_SITE, HandlerId::TcpGetStatus),
            CallSite::new(RESET_SITE, HandlerId::ResetQueues),
        ];

        Self {
            variant: TargetVariant::Ps2Minimal,
            command_channel: false,
            conventions: Conventions {
                best_effort_empty: WOULD_BLOCK,
                status_empty: 0x0000_ffff,
            },
            table: PatchTable::new(vec![NETWORK_BATTLE_PATCH, SKIP_DIAL_PATCH], calls),
        }
    }

    fn ps2_rpc() -> Self {
        let mut calls = vec![
            CallSite::new(OPEN_SITE, HandlerId::TcpOpen),
            CallSite::new(CLOSE_SITE, HandlerId::TcpClose),
            CallSite::new(SEND_SITE, HandlerId::TcpSend),
            CallSite::new(RECV_SITE, HandlerId::TcpRecv),
            CallSite::new(RECEIVE_AVAILABLE_SITE, HandlerId::ReceiveAvailable),
            CallSite::new(GET_STATUS_SITE, HandlerId::TcpGetStatus),
            CallSite::new(RESET_SITE, HandlerId::ResetQueues),
            CallSite::new(RESOLVE_BEGIN_SITE, HandlerId::ResolveBegin),
            CallSite::new(RESOLVE_RESULT_SITE, HandlerId::ResolveResult),
        ];
        calls.extend(
            RESOLVE_RELEASE_SITES
                .into_iter()
                .map(|site| CallSite::new(site, HandlerId::ResolveRelease)),
        );

        Self {
            variant: TargetVariant::Ps2Rpc,
            command_channel: true,
            conventions: Conventions {
                best_effort_empty: 0,
                status_empty: WOULD_BLOCK,
            },
            table: PatchTable::new(vec![NETWORK_BATTLE_PATCH, SKIP_DIAL_PATCH], calls),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn minimal_build_leaves_the_lifecycle_alone() {
        let profile = TargetProfile::for_variant(TargetVariant::Ps2Minimal);

        assert!(!profile.command_channel);
        assert!(profile.table.calls.iter().all(|call| !matches!(
            call.handler,
            HandlerId::TcpOpen | HandlerId::TcpClose | HandlerId::ResolveBegin
        )));
        assert_eq!(profile.conventions.best_effort_empty, WOULD_BLOCK);
    }

    #[rstest]
    fn rpc_build_redirects_both_release_sites() {
        let profile = TargetProfile::for_variant(TargetVariant::Ps2Rpc);

        let releases = profile
            .table
            .calls
            .iter()
            .filter(|call| call.handler == HandlerId::ResolveRelease)
            .count();

        assert!(profile.command_channel);
        assert_eq!(releases, 2);
        assert_eq!(profile.table.calls.len(), 11);
        assert_eq!(profile.table.data.len(), 2);
    }

    #[rstest]
    #[case(EmptySentinel::Zero, 0)]
    #[case(EmptySentinel::WouldBlock, WOULD_BLOCK)]
    fn best_effort_sentinel_can_be_overridden(#[case] sentinel: EmptySentinel, #[case] expected: u32) {
        let conventions = TargetProfile::for_variant(TargetVariant::Ps2Minimal)
            .conventions
            .with_best_effort_empty(sentinel);

        assert_eq!(conventions.best_effort_empty, expected);
        assert_eq!(conventions.status_empty, 0x0000_ffff);
    }
}
