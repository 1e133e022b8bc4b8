// src/exec/command.rs

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Program plus argument list, as configured (before env expansion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a command line on whitespace: first word is the program.
    ///
    /// No shell quoting is interpreted; use `cmd` + `args` in the config file
    /// for arguments containing spaces. Returns `None` for a blank line.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    /// Copy with `$VAR` / `${VAR}` references expanded from the process
    /// environment.
    pub fn expanded(&self) -> Self {
        Self {
            program: expand_env(&self.program),
            args: self.args.iter().map(|a| expand_env(a)).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("env reference pattern is valid")
});

/// Expand `$VAR` and `${VAR}` from the process environment.
///
/// Unset variables expand to the empty string; a `$` not followed by a
/// variable name is kept as is.
pub fn expand_env(s: &str) -> String {
    expand_with(s, |name| std::env::var(name).ok())
}

/// Same as [`expand_env`] with a custom variable lookup.
pub fn expand_with(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    ENV_REF
        .replace_all(s, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_default()
        })
        .into_owned()
}
