//! Logging for the layer: subscriber setup, and the debug print gate the handlers log through.

use std::{
    fmt,
    fs::{File, OpenOptions},
    io,
    path::Path,
};

use chrono::Local;
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*};

/// Environment variable for specifying layer log directory path
pub const TETHER_LAYER_LOG_PATH: &str = "TETHER_LAYER_LOG_PATH";

/// Initialize logger. Logs always go to stderr, and additionally to a file inside
/// [`TETHER_LAYER_LOG_PATH`] when it is set.
pub fn init_tracing() {
    let log_file = std::env::var(TETHER_LAYER_LOG_PATH)
        .ok()
        .and_then(|log_dir| {
            open_log_file(&log_dir)
                .map_err(|err| {
                    eprintln!("Failed to open log file from {TETHER_LAYER_LOG_PATH} (error: {err})");
                    err
                })
                .ok()
        });

    init_subscriber(log_file);
}

fn init_subscriber(log_file: Option<File>) {
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::from_default_env());

    let file_layer = log_file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .compact()
    });

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr);

    // stderr must come last, otherwise ANSI codes leak into the file.
    if let Err(err) = registry.with(file_layer).with(stderr_layer).try_init() {
        eprintln!("tether-layer: tracing was already initialized ({err})");
    }
}

fn open_log_file(log_dir: &str) -> io::Result<File> {
    let dir_path = Path::new(log_dir);
    if dir_path.as_os_str().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "log directory path is empty",
        ));
    }
    std::fs::create_dir_all(dir_path)?;

    let file_name = log_file_name(&sanitized_process_name(), std::process::id());
    eprintln!("tether-layer logging to file: {:?}", dir_path.join(&file_name));

    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(dir_path.join(file_name))
}

fn log_file_name(process_name: &str, pid: u32) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("tether-layer_{timestamp}_{process_name}_pid{pid}.log")
}

fn sanitized_process_name() -> String {
    let raw_name = std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem()?.to_str().map(String::from))
        .unwrap_or_else(|| "unknown".to_string());

    raw_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Runtime switch for the chatty, per-call logging of the handlers.
///
/// Lifecycle events (open, close, resolve, installation) are logged regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugPrint {
    enabled: bool,
}

impl DebugPrint {
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Formats bytes as space separated hex pairs, `"01 ab ff"`.
pub(crate) struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, byte) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use rstest::rstest;
    use tether_config::util::testing::with_env_vars;

    use super::*;

    #[rstest]
    #[case(&[], "")]
    #[case(&[0x01], "01")]
    #[case(&[0x01, 0xab, 0xff], "01 ab ff")]
    fn hex_bytes(#[case] bytes: &[u8], #[case] expected: &str) {
        assert_eq!(HexBytes(bytes).to_string(), expected);
    }

    #[rstest]
    fn log_file_name_carries_process_and_pid() {
        let name = log_file_name("emu", 42);

        assert!(name.starts_with("tether-layer_"));
        assert!(name.ends_with("_emu_pid42.log"));
    }

    #[rstest]
    fn empty_log_dir_is_rejected() {
        assert_eq!(
            open_log_file("").unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }

    #[rstest]
    fn opens_file_inside_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs");

        open_log_file(nested.to_str().unwrap()).unwrap();

        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 1);
    }

    #[rstest]
    fn init_tracing_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().to_str().unwrap();

        with_env_vars(
            vec![(TETHER_LAYER_LOG_PATH, Some(log_dir)), ("RUST_LOG", Some("debug"))],
            || {
                init_tracing();
                tracing::info!("logging smoke test");
                thread::sleep(Duration::from_millis(20));
            },
        );

        let entries = std::fs::read_dir(dir.path())
            .unwrap()
            .collect::<io::Result<Vec<_>>>()
            .unwrap();
        let [entry] = entries.as_slice() else {
            panic!("expected exactly one log file, found {entries:?}");
        };

        let log = std::fs::read_to_string(entry.path()).unwrap();
        assert!(log.contains("logging smoke test"));
    }
}
