use std::fs;

use tether_config::LayerConfig;
use tether_protocol::SessionLayout;
use tracing::debug;

use crate::{
    error::{LayerError, Result},
    patch::{parse_patch_codes, PatchTable, Trampolines},
    target::TargetProfile,
};

/// Complete layer setup.
/// Contains [`LayerConfig`] and the target tables derived from it, checked once up front so
/// installation itself can't fail.
#[derive(Debug, Clone)]
pub struct LayerSetup {
    config: LayerConfig,
    profile: TargetProfile,
    layout: SessionLayout,
    trampolines: Trampolines,
}

impl LayerSetup {
    pub fn new(config: LayerConfig) -> Result<Self> {
        let mut profile = TargetProfile::for_variant(config.target);

        if let Some(sentinel) = config.best_effort_empty {
            profile.conventions = profile.conventions.with_best_effort_empty(sentinel);
        }

        if let Some(path) = config.patch_codes.as_deref() {
            let codes = parse_patch_codes(&fs::read_to_string(path)?)?;
            debug!(count = codes.len(), path = %path.display(), "loaded patch codes");
            profile.table.data.extend(codes);
        }

        if SessionLayout::checked_end(config.data_base, profile.command_channel).is_none() {
            return Err(LayerError::DataBlockOutOfRange {
                base: config.data_base,
                size: SessionLayout::footprint(profile.command_channel),
            });
        }

        let trampolines = Trampolines::new(config.trampoline_base);
        if trampolines.checked_end().is_none() {
            return Err(LayerError::TrampolinesOutOfRange {
                base: config.trampoline_base,
                size: Trampolines::footprint(),
            });
        }

        let layout = SessionLayout::new(config.data_base, profile.command_channel);

        profile.table.validate(&trampolines)?;

        if trampolines.base() < layout.end() && layout.base() < trampolines.end() {
            return Err(LayerError::Overlap {
                trampolines_start: trampolines.base(),
                trampolines_end: trampolines.end(),
                data_start: layout.base(),
                data_end: layout.end(),
            });
        }

        Ok(Self {
            config,
            profile,
            layout,
            trampolines,
        })
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn profile(&self) -> &TargetProfile {
        &self.profile
    }

    pub fn table(&self) -> &PatchTable {
        &self.profile.table
    }

    pub fn layout(&self) -> &SessionLayout {
        &self.layout
    }

    pub fn trampolines(&self) -> &Trampolines {
        &self.trampolines
    }
}
