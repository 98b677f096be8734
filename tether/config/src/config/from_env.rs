use std::{env, ffi::OsString, marker::PhantomData, str::FromStr};

use crate::config::{ConfigError, Result};

/// A setting read from the environment variable `name`.
///
/// Unset and empty variables count as "not configured", so `TETHER_DEBUG=` falls through to the
/// config file instead of failing to parse.
#[derive(Debug, Clone, Copy)]
pub struct FromEnv<T> {
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> FromEnv<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> FromEnv<T>
where
    T: FromStr,
{
    /// `None` when the variable isn't set (or is empty), an error when it doesn't parse.
    pub fn read(&self) -> Option<Result<T>> {
        let raw = env::var_os(self.name).filter(|raw| !raw.is_empty())?;
        Some(self.parse(raw))
    }

    fn parse(&self, raw: OsString) -> Result<T> {
        let invalid =
            |raw: &OsString| ConfigError::InvalidValue(raw.to_string_lossy().into(), self.name);

        let value = raw.to_str().ok_or_else(|| invalid(&raw))?;
        value.trim().parse().map_err(|_| invalid(&raw))
    }
}
