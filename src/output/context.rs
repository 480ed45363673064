use crate::cli::Cli;
use crate::error::Result;
use crate::format::terminal_width;
use serde::Serialize;
use std::io::IsTerminal;

/// Central output coordinator that respects json/quiet modes.
#[derive(Debug, Clone, Copy)]
pub struct OutputContext {
    mode: OutputMode,
    /// Terminal width (cached)
    width: usize,
    interactive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Plain text tables and lines
    Plain,
    /// JSON output only
    Json,
    /// Minimal output (quiet mode)
    Quiet,
}

impl OutputContext {
    /// Create from CLI global args
    #[must_use]
    pub fn from_args(args: &Cli) -> Self {
        Self::from_flags(args.json, args.quiet)
    }

    /// Create from CLI-style flags.
    #[must_use]
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Plain
        };
        Self {
            mode,
            width: terminal_width(),
            interactive: std::io::stdout().is_terminal(),
        }
    }

    pub const fn mode(&self) -> OutputMode {
        self.mode
    }
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }
    pub fn is_quiet(&self) -> bool {
        self.mode == OutputMode::Quiet
    }

    /// Width to truncate text lines to; `None` when piped.
    pub const fn max_width(&self) -> Option<usize> {
        if self.interactive {
            Some(self.width)
        } else {
            None
        }
    }

    /// Print text in plain mode.
    pub fn print(&self, content: &str) {
        if self.mode == OutputMode::Plain {
            print!("{content}");
            if !content.ends_with('\n') {
                println!();
            }
        }
    }

    /// Print `value` as pretty JSON in JSON mode.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json_pretty<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        if self.is_json() {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(())
    }

    /// JSON in JSON mode, otherwise the text `render` produces.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn emit<T, F>(&self, value: &T, render: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T, Option<usize>) -> String,
    {
        match self.mode {
            OutputMode::Json => self.json_pretty(value),
            OutputMode::Plain => {
                self.print(&render(value, self.max_width()));
                Ok(())
            }
            OutputMode::Quiet => Ok(()),
        }
    }

    pub fn success(&self, message: &str) {
        if self.mode == OutputMode::Plain {
            println!("✓ {message}");
        }
    }

    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Plain => eprintln!("Warning: {message}"),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }
}
