#![warn(clippy::indexing_slicing)]
#![deny(unused_crate_dependencies)]

//! Configuration for the tether layer.
//!
//! Every field can come from (in order of precedence) an environment variable, the config file,
//! or a built-in default. The config file is picked with [`TETHER_CONFIG_FILE_ENV`] or passed in
//! explicitly, and its format is chosen by extension (`.json`, `.toml`; no extension means JSON).
//!
//! ```toml
//! target = "ps2-rpc"
//! debug = false
//! data_base = "0x000f8000"
//! trampoline_base = "0x000fe000"
//! best_effort_empty = "zero"
//! patch_codes = "extra-codes.csv"
//! ```
pub mod config;
pub mod util;

use std::{
    ffi::OsStr,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::{source::Setting, ConfigError, Result, TetherConfig},
    util::Number,
};

/// Path of the config file to load when none is given explicitly.
pub const TETHER_CONFIG_FILE_ENV: &str = "TETHER_CONFIG_FILE";
pub const TETHER_TARGET_ENV: &str = "TETHER_TARGET";
pub const TETHER_DEBUG_ENV: &str = "TETHER_DEBUG";
pub const TETHER_DATA_BASE_ENV: &str = "TETHER_DATA_BASE";
pub const TETHER_TRAMPOLINE_BASE_ENV: &str = "TETHER_TRAMPOLINE_BASE";
pub const TETHER_BEST_EFFORT_EMPTY_ENV: &str = "TETHER_BEST_EFFORT_EMPTY";
pub const TETHER_PATCH_CODES_ENV: &str = "TETHER_PATCH_CODES";

/// Default address of the session data block (command channel + queues).
pub const DEFAULT_DATA_BASE: u32 = 0x000f_8000;

/// Default address of the first handler trampoline slot.
pub const DEFAULT_TRAMPOLINE_BASE: u32 = 0x000f_e000;

/// Which build of the instrumented application we are patching.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetVariant {
    /// Queues only, no socket lifecycle control.
    Ps2Minimal,
    /// Queues plus the command channel (open/close, hostname resolution stubs).
    #[default]
    Ps2Rpc,
}

impl TargetVariant {
    pub const fn as_str(self) -> &'static str {
        match self {
            TargetVariant::Ps2Minimal => "ps2-minimal",
            TargetVariant::Ps2Rpc => "ps2-rpc",
        }
    }
}

impl fmt::Display for TargetVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ps2-minimal" => Ok(Self::Ps2Minimal),
            "ps2-rpc" => Ok(Self::Ps2Rpc),
            invalid => Err(ConfigError::InvalidValue(invalid.into(), TETHER_TARGET_ENV)),
        }
    }
}

/// What the best-effort receive returns when there is nothing to read.
///
/// The two shipped builds disagree here, so by default the sentinel follows the target variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptySentinel {
    /// `0`, "read nothing".
    Zero,
    /// `-1` (`0xffffffff`), "would block".
    WouldBlock,
}

impl FromStr for EmptySentinel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zero" => Ok(Self::Zero),
            "would-block" => Ok(Self::WouldBlock),
            invalid => Err(ConfigError::InvalidValue(
                invalid.into(),
                TETHER_BEST_EFFORT_EMPTY_ENV,
            )),
        }
    }
}

/// The config file as written by the user, every field optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerFileConfig {
    pub target: Option<TargetVariant>,
    pub debug: Option<bool>,
    pub data_base: Option<Number>,
    pub trampoline_base: Option<Number>,
    pub best_effort_empty: Option<EmptySentinel>,
    pub patch_codes: Option<PathBuf>,
}

impl LayerFileConfig {
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let contents = std::fs::read_to_string(path.as_ref())?;

        match path.as_ref().extension().and_then(OsStr::to_str) {
            // No Extension? assume json
            Some("json") | None => Ok(serde_json::from_str::<Self>(&contents)?),
            Some("toml") => Ok(toml::from_str::<Self>(&contents)?),
            ext => Err(ConfigError::InvalidExtension(ext.map(String::from))),
        }
    }
}

impl TetherConfig for LayerFileConfig {
    type Generated = LayerConfig;

    fn generate_config(self) -> Result<Self::Generated> {
        let target = Setting::new(TETHER_TARGET_ENV, self.target).or(TargetVariant::default())?;
        let debug = Setting::new(TETHER_DEBUG_ENV, self.debug).or(true)?;
        let data_base = Setting::new(TETHER_DATA_BASE_ENV, self.data_base)
            .or(Number(DEFAULT_DATA_BASE))?
            .into();
        let trampoline_base = Setting::new(TETHER_TRAMPOLINE_BASE_ENV, self.trampoline_base)
            .or(Number(DEFAULT_TRAMPOLINE_BASE))?
            .into();
        let best_effort_empty =
            Setting::new(TETHER_BEST_EFFORT_EMPTY_ENV, self.best_effort_empty).optional()?;
        let patch_codes = Setting::new(TETHER_PATCH_CODES_ENV, self.patch_codes).optional()?;

        Ok(LayerConfig {
            target,
            debug,
            data_base,
            trampoline_base,
            best_effort_empty,
            patch_codes,
        })
    }
}

/// The resolved configuration the layer runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerConfig {
    /// ### target
    ///
    /// Build of the instrumented application, selects the call-site table.
    pub target: TargetVariant,

    /// ### debug
    ///
    /// Initial state of the debug print gate (per-call argument logging and hex dumps).
    pub debug: bool,

    /// ### data_base
    ///
    /// Address of the session data block shared with the host agent.
    pub data_base: u32,

    /// ### trampoline_base
    ///
    /// Address of the first handler trampoline slot, call sites are redirected there.
    pub trampoline_base: u32,

    /// ### best_effort_empty
    ///
    /// Overrides the target's "nothing available" sentinel for the best-effort receive.
    pub best_effort_empty: Option<EmptySentinel>,

    /// ### patch_codes
    ///
    /// File with extra `size, address, original, changed` data patches.
    pub patch_codes: Option<PathBuf>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            target: TargetVariant::default(),
            debug: true,
            data_base: DEFAULT_DATA_BASE,
            trampoline_base: DEFAULT_TRAMPOLINE_BASE,
            best_effort_empty: None,
            patch_codes: None,
        }
    }
}

impl LayerConfig {
    /// Loads `path` if given, else the file named by [`TETHER_CONFIG_FILE_ENV`], else only env
    /// vars and defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(TETHER_CONFIG_FILE_ENV).map(PathBuf::from));

        let file_config = path
            .as_deref()
            .map(|path| {
                debug!(?path, "loading layer config file");
                LayerFileConfig::from_path(path)
            })
            .transpose()?;

        file_config.generate_config()
    }

    /// Env vars and defaults only.
    pub fn from_env() -> Result<Self> {
        LayerFileConfig::default().generate_config()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rstest::rstest;

    use super::*;
    use crate::util::testing::with_env_vars;

    const ALL_ENVS: [&str; 7] = [
        TETHER_CONFIG_FILE_ENV,
        TETHER_TARGET_ENV,
        TETHER_DEBUG_ENV,
        TETHER_DATA_BASE_ENV,
        TETHER_TRAMPOLINE_BASE_ENV,
        TETHER_BEST_EFFORT_EMPTY_ENV,
        TETHER_PATCH_CODES_ENV,
    ];

    fn cleared_env<'a>(overrides: &[(&'a str, &'a str)]) -> Vec<(&'a str, Option<&'a str>)> {
        ALL_ENVS
            .iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| *value);
                (*name, value)
            })
            .collect()
    }

    #[rstest]
    fn defaults() {
        with_env_vars(cleared_env(&[]), || {
            let config = LayerConfig::from_env().unwrap();

            assert_eq!(
                config,
                LayerConfig {
                    target: TargetVariant::Ps2Rpc,
                    debug: true,
                    data_base: DEFAULT_DATA_BASE,
                    trampoline_base: DEFAULT_TRAMPOLINE_BASE,
                    best_effort_empty: None,
                    patch_codes: None,
                }
            );
        });
    }

    #[rstest]
    fn env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
target = "ps2-rpc"
debug = true
data_base = "0x00100000"
trampoline_base = 1048576
best_effort_empty = "zero"
"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();

        with_env_vars(
            cleared_env(&[
                (TETHER_CONFIG_FILE_ENV, path.as_str()),
                (TETHER_TARGET_ENV, "ps2-minimal"),
                (TETHER_DEBUG_ENV, "false"),
            ]),
            || {
                let config = LayerConfig::resolve(None).unwrap();

                assert_eq!(config.target, TargetVariant::Ps2Minimal);
                assert!(!config.debug);
                assert_eq!(config.data_base, 0x0010_0000);
                assert_eq!(config.trampoline_base, 0x0010_0000);
                assert_eq!(config.best_effort_empty, Some(EmptySentinel::Zero));
            },
        );
    }

    #[rstest]
    fn json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"target": "ps2-minimal", "patch_codes": "codes.csv"}}"#
        )
        .unwrap();
        let path = file.path().to_path_buf();

        with_env_vars(cleared_env(&[]), move || {
            let config = LayerConfig::resolve(Some(&path)).unwrap();

            assert_eq!(config.target, TargetVariant::Ps2Minimal);
            assert_eq!(config.patch_codes, Some(PathBuf::from("codes.csv")));
        });
    }

    #[rstest]
    #[case(TETHER_TARGET_ENV, "ps3")]
    #[case(TETHER_DATA_BASE_ENV, "0xzz")]
    #[case(TETHER_BEST_EFFORT_EMPTY_ENV, "minus-one")]
    fn invalid_env_values(#[case] name: &'static str, #[case] value: &'static str) {
        with_env_vars(cleared_env(&[(name, value)]), || {
            assert!(matches!(
                LayerConfig::from_env(),
                Err(ConfigError::InvalidValue(_, env)) if env == name
            ));
        });
    }

    #[rstest]
    fn unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();

        assert!(matches!(
            LayerFileConfig::from_path(file.path()),
            Err(ConfigError::InvalidExtension(Some(ext))) if ext == "ini"
        ));
    }

    #[rstest]
    fn unknown_fields_are_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "queue_capacity = 8192").unwrap();

        assert!(matches!(
            LayerFileConfig::from_path(file.path()),
            Err(ConfigError::Toml(_))
        ));
    }
}
