//! The Hook Installer: writes a [`PatchTable`](crate::patch::PatchTable) into the application,
//! once per session.

use tether_protocol::{Address, AddressSpace};
use tracing::{debug, info, trace, warn};

use crate::{
    patch::{PatchWidth, PatchWrite},
    setup::LayerSetup,
    state::Session,
};

/// What [`install_hooks`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Patches written. `skipped` counts conditional codes whose `original` didn't match.
    Installed { written: usize, skipped: usize },
    /// The session was already patched, nothing was written.
    AlreadyInstalled,
}

/// Writes patches into some [`AddressSpace`], keeping count.
pub(crate) struct HookManager<'a, M> {
    memory: &'a mut M,
    written: usize,
    skipped: usize,
}

impl<'a, M: AddressSpace> HookManager<'a, M> {
    pub(crate) fn new(memory: &'a mut M) -> Self {
        Self {
            memory,
            written: 0,
            skipped: 0,
        }
    }

    fn read(&self, width: PatchWidth, address: Address) -> u32 {
        match width {
            PatchWidth::Byte => u32::from(self.memory.read8(address)),
            PatchWidth::Half => u32::from(self.memory.read16(address)),
            PatchWidth::Word => self.memory.read32(address),
        }
    }

    /// Writes `patch`, unless it expects an `original` value that isn't there (a code meant for
    /// another build of the application).
    pub(crate) fn apply(&mut self, patch: PatchWrite) {
        if let Some(original) = patch.original {
            let found = self.read(patch.width, patch.address);
            if found != original {
                warn!(
                    "skipping patch at {:#010x}: expected {original:#x}, found {found:#x}",
                    patch.address
                );
                self.skipped += 1;
                return;
            }
        }

        trace!("patching {:#010x} <- {:#010x}", patch.address, patch.value);
        match patch.width {
            PatchWidth::Byte => self.memory.write8(patch.address, patch.value as u8),
            PatchWidth::Half => self.memory.write16(patch.address, patch.value as u16),
            PatchWidth::Word => self.memory.write32(patch.address, patch.value),
        }
        self.written += 1;
    }

    pub(crate) fn memory(&mut self) -> &mut M {
        &mut *self.memory
    }

    pub(crate) fn finish(self) -> InstallOutcome {
        InstallOutcome::Installed {
            written: self.written,
            skipped: self.skipped,
        }
    }
}

/// Patches the application and prepares the session data block. A second call on the same
/// session is a logged no-op.
pub(crate) fn install_hooks<M: AddressSpace>(
    session: &mut Session,
    setup: &LayerSetup,
    memory: &mut M,
) -> InstallOutcome {
    if session.is_initialized() {
        debug!("already initialized");
        return InstallOutcome::AlreadyInstalled;
    }

    let mut hook_manager = HookManager::new(memory);
    for patch in setup.table().writes(setup.trampolines()) {
        hook_manager.apply(patch);
    }

    session.layout().write_tags(hook_manager.memory());
    session.reset_queues(hook_manager.memory());
    session.mark_initialized();

    let outcome = hook_manager.finish();
    info!(
        target_variant = %setup.profile().variant,
        ?outcome,
        "hooks installed, data block at {:#010x}",
        setup.layout().base()
    );
    outcome
}
