// src/output.rs

//! Multiplexed output of all supervised processes.
//!
//! Every task gets two [`Outlet`]s (stdout and stderr) from one shared
//! [`OutletFactory`]. Lines are written as `"<name> | <line>"` with the name
//! padded to the longest task name, so output of concurrent tasks stays
//! readable. All writes go through a single lock; a line is never split by
//! another task's output.

use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};

use owo_colors::{AnsiColors, OwoColorize};

const COLORS: [AnsiColors; 6] = [
    AnsiColors::Cyan,
    AnsiColors::Yellow,
    AnsiColors::Green,
    AnsiColors::Magenta,
    AnsiColors::Red,
    AnsiColors::Blue,
];

struct Sink {
    writer: Box<dyn Write + Send>,
    padding: usize,
    colored: bool,
}

/// Shared output sink; cheap to clone.
#[derive(Clone)]
pub struct OutletFactory {
    sink: Arc<Mutex<Sink>>,
}

impl std::fmt::Debug for OutletFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutletFactory").finish_non_exhaustive()
    }
}

impl OutletFactory {
    /// Sink writing to the process stdout, coloured when it is a terminal.
    pub fn stdout() -> Self {
        let colored = io::stdout().is_terminal();
        Self::with_writer(Box::new(io::stdout()), colored)
    }

    /// Sink writing to an arbitrary writer (tests capture into a buffer).
    pub fn with_writer(writer: Box<dyn Write + Send>, colored: bool) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Sink {
                writer,
                padding: 0,
                colored,
            })),
        }
    }

    /// Create an outlet for task `name`; `index` picks its colour.
    pub fn outlet(&self, name: &str, index: usize, is_error: bool) -> Outlet {
        {
            let mut sink = self.lock();
            sink.padding = sink.padding.max(name.len());
        }
        Outlet {
            name: name.to_string(),
            color: COLORS[index % COLORS.len()],
            is_error,
            factory: self.clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Sink> {
        // A poisoned sink still holds a usable writer.
        self.sink.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Writer handle of one task stream.
#[derive(Clone, Debug)]
pub struct Outlet {
    name: String,
    color: AnsiColors,
    is_error: bool,
    factory: OutletFactory,
}

impl Outlet {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write one line (without its trailing newline) under the sink lock.
    pub fn write_line(&self, line: &str) {
        let mut sink = self.factory.lock();
        let prefix = format!("{:<width$} | ", self.name, width = sink.padding);

        let rendered = if sink.colored {
            let prefix = prefix.color(self.color).bold().to_string();
            if self.is_error {
                format!("{prefix}{}\n", line.red())
            } else {
                format!("{prefix}{line}\n")
            }
        } else {
            format!("{prefix}{line}\n")
        };

        // Output is best effort; a closed stdout must not take the task down.
        let _ = sink.writer.write_all(rendered.as_bytes());
        let _ = sink.writer.flush();
    }
}
