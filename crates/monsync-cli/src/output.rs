//! Console output
//!
//! Human mode writes status lines with a leading marker. JSON mode keeps
//! stdout for the single document a command produces; diagnostics go to
//! stderr as one JSON object per line.

use serde_json::{json, Value};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Sink for command results and diagnostics
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &Value);
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Success,
    Error,
    Warning,
    Info,
}

impl Level {
    fn marker(self) -> &'static str {
        match self {
            Level::Success => "\u{2713} ",
            Level::Error => "\u{2717} Error: ",
            Level::Warning => "\u{26a0} Warning: ",
            Level::Info => "  ",
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Level::Error | Level::Warning)
    }
}

struct Console {
    format: OutputFormat,
}

impl Console {
    fn emit(&self, level: Level, message: &str) {
        match (self.format, level) {
            (OutputFormat::Human, level) if level.to_stderr() => {
                eprintln!("{}{message}", level.marker());
            }
            (OutputFormat::Human, level) => println!("{}{message}", level.marker()),
            // Stdout stays parseable; progress lines are dropped
            (OutputFormat::Json, Level::Error) => {
                eprintln!("{}", json!({"level": "error", "message": message}));
            }
            (OutputFormat::Json, Level::Warning) => {
                eprintln!("{}", json!({"level": "warning", "message": message}));
            }
            (OutputFormat::Json, _) => {}
        }
    }
}

impl OutputFormatter for Console {
    fn success(&self, message: &str) {
        self.emit(Level::Success, message);
    }

    fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Level::Warning, message);
    }

    fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn print_json(&self, value: &Value) {
        if self.format.is_json() {
            println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
        }
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    Box::new(Console { format })
}

/// "1 monitor", "2 monitors"
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
