//! Command output: `key\tvalue` lines or pretty JSON

use serde::Serialize;
use std::io::{self, Write};

use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Text,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }
}

/// Writes command results to `out` and warnings to `err`
pub struct Printer<O: Write, E: Write> {
    mode: OutputMode,
    out: O,
    err: E,
}

impl Printer<io::Stdout, io::Stderr> {
    pub fn stdio(mode: OutputMode) -> Self {
        Self::new(mode, io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Printer<O, E> {
    pub fn new(mode: OutputMode, out: O, err: E) -> Self {
        Self { mode, out, err }
    }

    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    pub fn kv(&mut self, key: &str, value: &str) -> Result<()> {
        writeln!(self.out, "{}\t{}", key, value)?;
        Ok(())
    }

    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)?;
        Ok(())
    }

    /// Write text as-is, adding a newline only if it lacks one
    pub fn raw(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes())?;
        if !text.is_empty() && !text.ends_with('\n') {
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, value)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn warn(&mut self, text: &str) -> Result<()> {
        writeln!(self.err, "{}", text)?;
        Ok(())
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}
