//! Append-only run log with nesting-aware indentation.
//!
//! A [`NestedLog`] writes each entry to up to two channels: a console stream
//! (stdout by default) and a plain-text file. The stream receives the raw text.
//! The file receives every non-empty line prefixed with a timestamp and the
//! indentation token repeated once per nesting level.
//!
//! Nesting and channel suppression are scoped with RAII guards that restore the
//! previous state on drop, including when the scope is left by `?` or by a panic.
//! The guards share state cells with the log rather than borrowing it, so code
//! holding a guard can keep writing to the log.
//!
//! ```no_run
//! use iokit::nested_log::{LogOptions, NestedLog};
//!
//! let mut log = NestedLog::open("logs/run.txt", LogOptions::default())?;
//! log.write("outer\n", None, None, 0)?;
//! {
//!     let _indent = log.indentation();
//!     log.write("inner\n", None, None, 0)?;
//! }
//! # Ok::<(), iokit::error::IoKitError>(())
//! ```

use crate::config::ScriptSettings;
use crate::error::{AppResult, IoKitError};
use chrono::Local;
use std::cell::{Cell, RefCell};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Timestamp placed in front of every file line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const DELIMITER_WIDTH: usize = 80;

/// Channel defaults and the indentation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Echo to the console stream.
    pub to_stream: bool,
    /// Write to the log file.
    pub to_file: bool,
    /// Repeated once per nesting level.
    pub indentation_token: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            to_stream: true,
            to_file: true,
            indentation_token: "    ".to_string(),
        }
    }
}

impl From<&ScriptSettings> for LogOptions {
    fn from(settings: &ScriptSettings) -> Self {
        Self {
            to_stream: settings.to_stream,
            to_file: settings.to_file,
            indentation_token: settings.indentation_token.clone(),
        }
    }
}

/// An indented log written to a file and echoed to a console stream.
pub struct NestedLog {
    path: PathBuf,
    file: File,
    stream: Box<dyn Write>,
    indentation_token: String,
    level: Rc<Cell<usize>>,
    to_stream: Rc<Cell<bool>>,
    to_file: Rc<Cell<bool>>,
}

impl NestedLog {
    /// Open (or append to) the log file, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>, options: LogOptions) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| IoKitError::InvalidLogPath(path.clone()))?;
        fs::create_dir_all(parent)?;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = %path.display(), "Opened run log");

        Ok(Self {
            path,
            file,
            stream: Box::new(io::stdout()),
            indentation_token: options.indentation_token,
            level: Rc::new(Cell::new(0)),
            to_stream: Rc::new(Cell::new(options.to_stream)),
            to_file: Rc::new(Cell::new(options.to_file)),
        })
    }

    /// Replace the console stream.
    pub fn with_stream(mut self, stream: Box<dyn Write>) -> Self {
        self.stream = stream;
        self
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Token repeated once per level.
    pub fn indentation_token(&self) -> &str {
        &self.indentation_token
    }

    /// Current nesting depth.
    pub fn indentation_level(&self) -> usize {
        self.level.get()
    }

    /// Whether entries currently reach the console.
    pub fn to_stream(&self) -> bool {
        self.to_stream.get()
    }

    /// Whether entries currently reach the file.
    pub fn to_file(&self) -> bool {
        self.to_file.get()
    }

    /// Switch the console channel. A live [`ChannelGuard`] still restores what it captured.
    pub fn set_to_stream(&self, enabled: bool) {
        self.to_stream.set(enabled);
    }

    /// Switch the file channel.
    pub fn set_to_file(&self, enabled: bool) {
        self.to_file.set(enabled);
    }

    /// Write an entry.
    ///
    /// `to_stream` and `to_file` fall back to the log's current channel flags when
    /// `None`. `blank_lines_after` newlines are appended on each channel written.
    pub fn write(
        &mut self,
        text: &str,
        to_stream: Option<bool>,
        to_file: Option<bool>,
        blank_lines_after: usize,
    ) -> AppResult<()> {
        let trailer = "\n".repeat(blank_lines_after);

        if to_stream.unwrap_or_else(|| self.to_stream.get()) {
            self.stream.write_all(text.as_bytes())?;
            self.stream.write_all(trailer.as_bytes())?;
            self.stream.flush()?;
        }

        if to_file.unwrap_or_else(|| self.to_file.get()) {
            let prefix = format!(
                "{} - {}",
                Local::now().format(TIMESTAMP_FORMAT),
                self.indentation_token.repeat(self.level.get())
            );
            let prefixed = text
                .split('\n')
                .map(|line| {
                    if line.is_empty() {
                        String::new()
                    } else {
                        format!("{prefix}{line}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            self.file.write_all(prefixed.as_bytes())?;
            self.file.write_all(trailer.as_bytes())?;
            self.file.flush()?;
        }

        Ok(())
    }

    /// Append text to the file exactly as given: no prefix, no console echo.
    pub fn write_raw(&mut self, text: &str) -> AppResult<()> {
        self.file.write_all(text.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    /// Record who opened the log and when, followed by a delimiter line.
    pub fn greeting(&mut self) -> AppResult<()> {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let text = format!(
            "Log opened by {} at {}\n{}\n\n",
            user,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            "-".repeat(DELIMITER_WIDTH)
        );
        self.write_raw(&text)
    }

    /// Increase the nesting depth until the returned guard drops.
    pub fn indentation(&self) -> IndentationGuard {
        let previous = self.level.get();
        self.level.set(previous + 1);
        IndentationGuard {
            level: Rc::clone(&self.level),
            previous,
        }
    }

    /// Snapshot both channel flags; they are restored when the returned guard drops.
    pub fn channels(&self) -> ChannelGuard {
        ChannelGuard {
            to_stream: Rc::clone(&self.to_stream),
            to_file: Rc::clone(&self.to_file),
            previous: (self.to_stream.get(), self.to_file.get()),
        }
    }

    /// Run `f` one level deeper.
    pub fn indented<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let _guard = self.indentation();
        f(self)
    }

    /// Run `f` with the channel flags temporarily set.
    pub fn with_channels<T>(
        &mut self,
        to_stream: bool,
        to_file: bool,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let _guard = self.channels();
        self.set_to_stream(to_stream);
        self.set_to_file(to_file);
        f(self)
    }
}

impl std::fmt::Debug for NestedLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedLog")
            .field("path", &self.path)
            .field("indentation_level", &self.level.get())
            .field("to_stream", &self.to_stream.get())
            .field("to_file", &self.to_file.get())
            .finish()
    }
}

// =============================================================================
// Scope guards
// =============================================================================

/// Restores the nesting depth on drop.
#[must_use = "indentation ends as soon as the guard is dropped"]
pub struct IndentationGuard {
    level: Rc<Cell<usize>>,
    previous: usize,
}

impl Drop for IndentationGuard {
    fn drop(&mut self) {
        self.level.set(self.previous);
    }
}

/// Restores both channel flags on drop.
#[must_use = "channel flags are restored as soon as the guard is dropped"]
pub struct ChannelGuard {
    to_stream: Rc<Cell<bool>>,
    to_file: Rc<Cell<bool>>,
    previous: (bool, bool),
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.to_stream.set(self.previous.0);
        self.to_file.set(self.previous.1);
    }
}

// =============================================================================
// In-memory stream
// =============================================================================

/// A cloneable in-memory console stream, for capturing what a run echoes.
#[derive(Debug, Clone, Default)]
pub struct CaptureStream {
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl CaptureStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.borrow()).into_owned()
    }
}

impl Write for CaptureStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
