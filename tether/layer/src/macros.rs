/// Emits a `debug!` event only while the session's debug print gate is open.
///
/// The arguments are not evaluated at all when the gate is closed, so hex dumps that need to read
/// guest memory cost nothing in a quiet session.
macro_rules! debug_print {
    ($gate:expr, $($arg:tt)+) => {
        if $gate.is_enabled() {
            ::tracing::debug!($($arg)+);
        }
    };
}

pub(crate) use debug_print;
