use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

const LOG_FILE_NAME: &str = "beacon.log";
const ARCHIVE_PREFIX: &str = "beacon-";
const MAX_LOG_BYTES: u64 = 1_000_000;
const MAX_ARCHIVES: usize = 5;

static SINK: OnceLock<Mutex<Sink>> = OnceLock::new();
static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// The open log file plus how much has been written to it, so rotation can
/// happen mid-session. The launcher runs for days; rotating only at startup
/// would let one session grow without bound.
struct Sink {
    file: File,
    written: u64,
    dir: PathBuf,
}

pub fn logs_dir() -> PathBuf {
    crate::config::stable_app_data_dir().join("logs")
}

pub fn init() -> Result<(), std::io::Error> {
    let dir = logs_dir();
    fs::create_dir_all(&dir)?;
    let path = dir.join(LOG_FILE_NAME);

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let written = file.metadata().map(|m| m.len()).unwrap_or(0);

    let _ = SINK.set(Mutex::new(Sink { file, written, dir }));
    install_panic_hook();
    Ok(())
}

pub fn info(message: &str) {
    log(Level::Info, message);
}

pub fn warn(message: &str) {
    log(Level::Warn, message);
}

pub fn error(message: &str) {
    log(Level::Error, message);
}

fn log(level: Level, message: &str) {
    let Some(sink) = SINK.get() else {
        return;
    };
    let Ok(mut sink) = sink.lock() else {
        return;
    };

    if sink.written >= MAX_LOG_BYTES {
        rotate(&mut sink);
    }

    let line = format!("[{}] [{level}] {message}\n", now_millis());
    if sink.file.write_all(line.as_bytes()).is_ok() {
        sink.written += line.len() as u64;
        let _ = sink.file.flush();
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Moves the active file aside under a timestamped archive name and starts a
/// fresh one. A failed rotation keeps logging into the old file.
fn rotate(sink: &mut Sink) {
    let active = sink.dir.join(LOG_FILE_NAME);
    let archived = sink.dir.join(archive_name(now_millis()));
    if fs::rename(&active, &archived).is_err() {
        return;
    }

    let Ok(fresh) = OpenOptions::new().create(true).append(true).open(&active) else {
        return;
    };
    sink.file = fresh;
    sink.written = 0;
    prune_archives(&sink.dir);
}

fn archive_name(stamp: u128) -> String {
    format!("{ARCHIVE_PREFIX}{stamp}.log")
}

fn is_archive_name(name: &str) -> bool {
    name.strip_prefix(ARCHIVE_PREFIX)
        .and_then(|rest| rest.strip_suffix(".log"))
        .map(|stamp| !stamp.is_empty() && stamp.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

fn prune_archives(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    let mut archives: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(is_archive_name)
                .unwrap_or(false)
        })
        .collect();

    // Timestamped names sort oldest-first.
    archives.sort();
    let excess = archives.len().saturating_sub(MAX_ARCHIVES);
    for oldest in archives.into_iter().take(excess) {
        let _ = fs::remove_file(oldest);
    }
}

fn install_panic_hook() {
    let _ = PANIC_HOOK_INSTALLED.get_or_init(|| {
        let prior = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let location = panic_info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()))
                .unwrap_or_else(|| "unknown".to_string());
            let payload = panic_info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic payload unavailable".to_string());
            error(&format!("panic at {location}: {payload}"));
            prior(panic_info);
        }));
    });
}
