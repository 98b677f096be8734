pub mod from_env;
pub mod source;

use thiserror::Error;

/// Errors returned while generating a [`LayerConfig`](crate::LayerConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("value {0:?} for {1:?} is invalid.")]
    InvalidValue(String, &'static str),

    #[error("tether-config: IO operation failed with `{0}`")]
    Io(#[from] std::io::Error),

    #[error("tether-config: `{0}`!")]
    SerdeJson(#[from] serde_json::Error),

    #[error("tether-config: `{0}`!")]
    Toml(#[from] toml::de::Error),

    #[error("tether-config: unsupported configuration file extension `{0:?}`!")]
    InvalidExtension(Option<String>),
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Turns a partially filled, file level config into the config the layer runs with.
pub trait TetherConfig {
    /// The resulting struct you plan on using in the rest of your code
    type Generated;

    /// Load configuration from all sources and output as [Self::Generated]
    fn generate_config(self) -> Result<Self::Generated>;
}

impl<T> TetherConfig for Option<T>
where
    T: TetherConfig + Default,
{
    type Generated = T::Generated;

    fn generate_config(self) -> Result<Self::Generated> {
        self.unwrap_or_default().generate_config()
    }
}
