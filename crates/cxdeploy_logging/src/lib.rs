//! Logging setup for the cxdeploy binary.
//!
//! Two layers: a size-rotated file under `$CXDEPLOY_HOME/logs` and stderr.
//! `RUST_LOG` overrides the default filter for both.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "cxdeploy=info,cxdeploy_db=warn";
const VERBOSE_LOG_FILTER: &str = "cxdeploy=debug,cxdeploy_db=debug";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration for a cxdeploy process.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Show debug output (including generated SQL) on stderr.
    pub verbose: bool,
    /// Write the rolling log file. Disabled for one-shot inspection commands.
    pub file: bool,
    /// Override for the log directory; defaults to [`logs_dir`].
    pub log_dir: Option<PathBuf>,
}

impl<'a> LogConfig<'a> {
    pub fn new(app_name: &'a str) -> Self {
        Self {
            app_name,
            verbose: false,
            file: true,
            log_dir: None,
        }
    }
}

/// Initialize tracing with an optional rolling file writer and stderr output.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let base_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    let console_filter = if config.verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        base_filter()
    };

    let file_layer = if config.file {
        let log_dir = match config.log_dir {
            Some(dir) => dir,
            None => ensure_logs_dir().context("Failed to ensure log directory")?,
        };
        let file_writer = SharedRollingWriter::new(log_dir, config.app_name)
            .context("Failed to initialize rolling log writer")?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(base_filter()),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install global tracing subscriber")?;

    Ok(())
}

/// The cxdeploy home directory: `$CXDEPLOY_HOME` or `~/.cxdeploy`.
pub fn cxdeploy_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("CXDEPLOY_HOME") {
        return Ok(PathBuf::from(override_path));
    }
    dirs::home_dir()
        .map(|home| home.join(".cxdeploy"))
        .context("Could not determine home directory; set CXDEPLOY_HOME")
}

/// The logs directory: `<home>/logs`.
pub fn logs_dir() -> Result<PathBuf> {
    Ok(cxdeploy_home()?.join("logs"))
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir()?;
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

struct RollingFileAppender {
    dir: PathBuf,
    base_name: String,
    max_files: usize,
    max_size: u64,
    file: Option<File>,
    current_size: u64,
}

impl RollingFileAppender {
    fn new(dir: PathBuf, base_name: &str, max_files: usize, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        let mut appender = Self {
            dir,
            base_name: sanitize_name(base_name),
            max_files: max_files.max(1),
            max_size,
            file: None,
            current_size: 0,
        };
        let (file, size) = appender.open_current_file()?;
        appender.file = Some(file);
        appender.current_size = size;
        if appender.current_size > appender.max_size {
            appender.rotate()?;
        }
        Ok(appender)
    }

    fn open_current_file(&self) -> io::Result<(File, u64)> {
        let path = self.current_path();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        Ok((file, size))
    }

    fn current_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.base_name))
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.base_name, index))
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }

        shift_rotated(&self.dir, &self.base_name, self.max_files)?;

        let (file, size) = self.open_current_file()?;
        self.file = Some(file);
        self.current_size = size;
        Ok(())
    }
}

/// Move `name.log` to `name.log.1`, `name.log.1` to `name.log.2` and so on,
/// dropping anything past `max_files - 1`.
fn shift_rotated(dir: &Path, base_name: &str, max_files: usize) -> io::Result<()> {
    let max_index = max_files.saturating_sub(1);
    let rotated = |idx: usize| dir.join(format!("{}.log.{}", base_name, idx));
    let current = dir.join(format!("{}.log", base_name));

    if max_index == 0 {
        if current.exists() {
            fs::remove_file(&current)?;
        }
        return Ok(());
    }

    let oldest = rotated(max_index);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }

    for idx in (1..max_index).rev() {
        let src = rotated(idx);
        if src.exists() {
            fs::rename(&src, rotated(idx + 1))?;
        }
    }

    if current.exists() {
        fs::rename(current, rotated(1))?;
    }

    Ok(())
}

impl Write for RollingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.current_size + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file unavailable"))?;
        let bytes = file.write(buf)?;
        self.current_size += bytes as u64;
        Ok(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

#[derive(Clone)]
struct SharedRollingWriter {
    inner: Arc<Mutex<RollingFileAppender>>,
}

impl SharedRollingWriter {
    fn new(dir: PathBuf, base_name: &str) -> Result<Self> {
        let appender = RollingFileAppender::new(dir, base_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
            .with_context(|| format!("Failed to open log file for {}", base_name))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(appender)),
        })
    }
}

struct SharedRollingWriterGuard {
    inner: Arc<Mutex<RollingFileAppender>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedRollingWriter {
    type Writer = SharedRollingWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedRollingWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for SharedRollingWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        guard.flush()
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
