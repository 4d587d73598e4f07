//! Event output shared by every command.
//!
//! Each event has a level, a stable dotted code and a human message. Text
//! mode prints the message (warnings and errors on stderr); JSON mode prints
//! one object per line so runs can be piped into `jq`.

use chrono::{Local, SecondsFormat};
use colored::*;
use lazy_static::lazy_static;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Level::Warn | Level::Error)
    }
}

#[derive(Debug, Clone, Copy)]
struct Renderer {
    format: OutputFormat,
    color: bool,
}

lazy_static! {
    static ref RENDERER: RwLock<Renderer> = RwLock::new(Renderer {
        format: OutputFormat::Text,
        color: true,
    });
}

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

/// Select the output format; color is also off when `NO_COLOR` is set.
pub fn init(format: OutputFormat, color: bool) {
    let color = color && std::env::var_os("NO_COLOR").is_none_or(|value| value.is_empty());
    if let Ok(mut renderer) = RENDERER.write() {
        *renderer = Renderer { format, color };
    }
}

fn renderer() -> Renderer {
    match RENDERER.read() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

const SEPARATOR: &str = "━";

#[derive(Serialize)]
struct Event<'a> {
    timestamp: String,
    level: &'a str,
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl Renderer {
    fn render(
        &self,
        level: Level,
        code: &str,
        message: &str,
        data: Option<serde_json::Value>,
    ) -> Option<String> {
        match self.format {
            OutputFormat::Text => Some(self.text_line(level, message)),
            OutputFormat::Json => serde_json::to_string(&Event {
                timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Millis, false),
                level: level.as_str(),
                code,
                message: strip_ansi(message),
                data,
            })
            .ok(),
        }
    }

    fn text_line(&self, level: Level, message: &str) -> String {
        let line = match level {
            Level::Warn => format!("warning: {message}"),
            Level::Error => format!("error: {message}"),
            Level::Debug => format!("debug: {message}"),
            Level::Info | Level::Success => message.to_string(),
        };
        if !self.color {
            return line;
        }
        match level {
            Level::Info => line,
            Level::Success => line.green().bold().to_string(),
            Level::Warn => line.yellow().bold().to_string(),
            Level::Error => line.red().bold().to_string(),
            Level::Debug => line.dimmed().to_string(),
        }
    }
}

/// Drop CSI escape sequences (colors, cursor moves) from `input`.
fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for terminator in chars.by_ref() {
                if ('@'..='~').contains(&terminator) {
                    break;
                }
            }
            continue;
        }
        out.push(ch);
    }
    out
}

pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    if level == Level::Debug && !is_debug_enabled() {
        return;
    }
    let Some(line) = renderer().render(level, code, message, data) else {
        return;
    };
    if level.to_stderr() {
        let _ = writeln!(io::stderr().lock(), "{line}");
    } else {
        let _ = writeln!(io::stdout().lock(), "{line}");
    }
}

pub fn get_output_format() -> OutputFormat {
    renderer().format
}

pub fn separator() {
    // Separators would break line-per-event JSON consumers
    if get_output_format() == OutputFormat::Json {
        return;
    }
    let _ = writeln!(io::stdout().lock(), "{}", SEPARATOR.repeat(60));
}

pub mod prelude {
    pub use super::{Level, OutputFormat, emit, get_output_format, is_debug_enabled, separator};
}
