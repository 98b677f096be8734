use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize};

/// A 32-bit number that may be written in decimal or as `0x`-prefixed hex, both in env vars and
/// in config files (where a plain integer is accepted too).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Number(pub u32);

impl FromStr for Number {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u32(s).map(Number)
    }
}

impl From<Number> for u32 {
    fn from(number: Number) -> Self {
        number.0
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NumberVisitor;

        impl de::Visitor<'_> for NumberVisitor {
            type Value = Number;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a 32-bit unsigned integer or a \"0x\" prefixed hex string")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Number, E> {
                u32::try_from(value)
                    .map(Number)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Number, E> {
                u32::try_from(value)
                    .map(Number)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Number, E> {
                value
                    .parse()
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
            }
        }

        deserializer.deserialize_any(NumberVisitor)
    }
}

/// Decimal, or hex with a `0x` / `0X` prefix.
pub fn parse_u32(value: &str) -> Result<u32, std::num::ParseIntError> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    }
}

/// Helpers for tests that touch the process environment.
pub mod testing {
    use std::{
        env,
        ffi::OsString,
        sync::{Mutex, MutexGuard},
    };

    /// Serializes every test that changes env vars, they are process wide.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Holds the env lock and puts the overridden variables back when dropped, also while
    /// unwinding from a failed assertion.
    pub struct EnvGuard {
        saved: Vec<(String, Option<OsString>)>,
        _lock: MutexGuard<'static, ()>,
    }

    impl EnvGuard {
        /// Sets (`Some`) or removes (`None`) each variable.
        pub fn set<'a, I>(vars: I) -> Self
        where
            I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
        {
            // A test that panicked while holding the lock has already restored its variables.
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            let saved = vars
                .into_iter()
                .map(|(name, value)| {
                    let previous = env::var_os(name);
                    match value {
                        Some(value) => env::set_var(name, value),
                        None => env::remove_var(name),
                    }
                    (name.to_owned(), previous)
                })
                .collect();

            Self { saved, _lock: lock }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, previous) in self.saved.drain(..).rev() {
                match previous {
                    Some(value) => env::set_var(&name, value),
                    None => env::remove_var(&name),
                }
            }
        }
    }

    /// Runs `test` with `vars` applied, see [`EnvGuard`].
    pub fn with_env_vars<F>(vars: Vec<(&str, Option<&str>)>, test: F)
    where
        F: FnOnce(),
    {
        let _guard = EnvGuard::set(vars);
        test();
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("4096", 4096)]
    #[case("0x000f8000", 0x000f_8000)]
    #[case(" 0XFF ", 0xff)]
    fn parses_decimal_and_hex(#[case] input: &str, #[case] expected: u32) {
        assert_eq!(parse_u32(input).unwrap(), expected);
    }

    #[rstest]
    #[case("0x")]
    #[case("-1")]
    #[case("0x1_0000_0000")]
    fn rejects_garbage(#[case] input: &str) {
        assert!(parse_u32(input).is_err());
    }

    #[rstest]
    fn deserializes_from_integers_and_strings() {
        #[derive(serde::Deserialize)]
        struct Holder {
            a: Number,
            b: Number,
        }

        let holder: Holder = serde_json::from_str(r#"{"a": 16, "b": "0x10"}"#).unwrap();
        assert_eq!((holder.a, holder.b), (Number(16), Number(16)));
        assert!(serde_json::from_str::<Holder>(r#"{"a": -1, "b": 0}"#).is_err());
    }

    #[rstest]
    fn env_is_restored_after_a_failed_test() {
        use std::{env, panic};

        use super::testing::with_env_vars;

        const NAME: &str = "TETHER_ENV_GUARD_VALUE";

        let failed = panic::catch_unwind(|| {
            with_env_vars(vec![(NAME, Some("inside"))], || {
                assert_eq!(env::var(NAME).as_deref(), Ok("inside"));
                panic!("failed assertion");
            });
        });
        assert!(failed.is_err());

        // also checks the lock is usable again after the panic
        with_env_vars(Vec::new(), || assert!(env::var_os(NAME).is_none()));
    }
}
