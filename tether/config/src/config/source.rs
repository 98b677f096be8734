//! Layered lookup of a single setting: environment first, then the config file, then a default.

use std::{fmt, str::FromStr};

use tracing::trace;

use crate::config::{from_env::FromEnv, Result};

/// Which layer a resolved setting was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Env(&'static str),
    File,
    Default,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Env(name) => write!(f, "env `{name}`"),
            Origin::File => f.write_str("config file"),
            Origin::Default => f.write_str("default"),
        }
    }
}

/// One setting with its env var and the (optional) value from the config file.
///
/// A variable that is set but doesn't parse is an error, it never falls through to the file.
#[derive(Debug, Clone)]
pub struct Setting<T> {
    env: FromEnv<T>,
    file: Option<T>,
}

impl<T> Setting<T>
where
    T: FromStr + fmt::Debug,
{
    pub fn new(env: &'static str, file: Option<T>) -> Self {
        Self {
            env: FromEnv::new(env),
            file,
        }
    }

    /// The first layer that has a value, together with where it came from.
    pub fn lookup(self) -> Result<Option<(T, Origin)>> {
        match self.env.read().transpose()? {
            Some(value) => Ok(Some((value, Origin::Env(self.env.name())))),
            None => Ok(self.file.map(|value| (value, Origin::File))),
        }
    }

    /// `None` when neither the environment nor the file configure it.
    pub fn optional(self) -> Result<Option<T>> {
        let name = self.env.name();
        let resolved = self.lookup()?;

        if let Some((value, origin)) = &resolved {
            trace!(setting = name, %origin, ?value, "resolved");
        }

        Ok(resolved.map(|(value, _)| value))
    }

    pub fn or(self, default: T) -> Result<T> {
        let name = self.env.name();
        let (value, origin) = self.lookup()?.unwrap_or((default, Origin::Default));

        trace!(setting = name, %origin, ?value, "resolved");
        Ok(value)
    }
}
