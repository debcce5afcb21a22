use std::fmt::{Display, Formatter};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{self, Config, ConfigError};
use crate::engine::{Engine, ResultsSnapshot};
use crate::logging;
use crate::plugin::ProviderRegistry;
use crate::providers::{AppCatalogProvider, FileScanProvider};
use crate::record_store::{RecordStore, StoreError};

#[derive(Debug)]
pub enum RuntimeError {
    Config(ConfigError),
    Store(StoreError),
    Io(std::io::Error),
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(error) => write!(f, "config error: {error}"),
            Self::Store(error) => write!(f, "store error: {error}"),
            Self::Io(error) => write!(f, "io error: {error}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<ConfigError> for RuntimeError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<StoreError> for RuntimeError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub config_path: Option<PathBuf>,
    pub once_query: Option<String>,
}

pub fn parse_cli_args(args: &[String]) -> Result<RuntimeOptions, String> {
    let mut options = RuntimeOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter.next().ok_or("--config requires a path")?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--once" => {
                let value = iter.next().ok_or("--once requires a query")?;
                options.once_query = Some(value.clone());
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(options)
}

pub fn run_with_options(options: RuntimeOptions) -> Result<(), RuntimeError> {
    let cfg = config::load(options.config_path.clone())?;
    if !cfg.config_path.exists() {
        config::save(&cfg)?;
        println!(
            "[beacon-core] wrote default config to {}",
            cfg.config_path.display()
        );
    }

    logging::init()?;
    logging::info(&format!(
        "startup progress_delay_ms={} selection_boost={} record_db_path={}",
        cfg.progress_delay_ms,
        cfg.selection_boost,
        cfg.record_db_path.display()
    ));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(drive(cfg, options.once_query))
}

async fn drive(cfg: Config, once_query: Option<String>) -> Result<(), RuntimeError> {
    let records = Arc::new(RecordStore::open_at(&cfg.record_db_path)?);
    let registry = Arc::new(ProviderRegistry::new(vec![
        Arc::new(AppCatalogProvider::deterministic_fixture(
            cfg.provider_result_limit,
        )),
        Arc::new(FileScanProvider::new(
            std::env::temp_dir(),
            cfg.provider_result_limit,
        )),
    ]));
    let engine = Engine::spawn(registry, records, &cfg);
    let settle = Duration::from_millis(cfg.progress_delay_ms + 150);

    if let Some(query) = once_query {
        engine.set_query_text(&query);
        tokio::time::sleep(settle).await;
        print_snapshot(&engine.results().borrow());
        return Ok(());
    }

    println!("[beacon-core] interactive mode; type a query, ':open N', ':pin N', ':history', or ':quit'");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        match line {
            ":quit" | ":q" => break,
            _ if line.starts_with(":open ") => {
                if let Ok(index) = line[6..].trim().parse::<usize>() {
                    match engine.invoke(index).await {
                        Ok(close) => println!("[beacon-core] launched (close_window={close})"),
                        Err(error) => println!("[beacon-core] launch failed: {error}"),
                    }
                }
            }
            _ if line.starts_with(":pin ") => {
                if let Ok(index) = line[5..].trim().parse::<usize>() {
                    match engine.set_pinned(index, true).await {
                        Ok(()) => print_snapshot(&engine.results().borrow()),
                        Err(error) => println!("[beacon-core] pin failed: {error}"),
                    }
                }
            }
            ":history" => match engine.history("").await {
                Ok(entries) => {
                    for entry in entries {
                        println!("  {}", entry.raw_query);
                    }
                }
                Err(error) => println!("[beacon-core] history failed: {error}"),
            },
            _ => {
                engine.set_query_text(line);
                tokio::time::sleep(settle).await;
                print_snapshot(&engine.results().borrow());
            }
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &ResultsSnapshot) {
    if !snapshot.visible || snapshot.results.is_empty() {
        println!("[beacon-core] no results");
        return;
    }
    for (index, result) in snapshot.results.iter().enumerate() {
        println!(
            "  [{index}] {} | {} (score {})",
            result.title, result.subtitle, result.effective_score
        );
    }
}
