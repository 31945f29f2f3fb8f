//! Line-oriented C text writer.

use std::fmt::{self, Write};

/// Accumulates C source text with tab indentation and preprocessor guards.
#[derive(Debug, Default)]
pub struct CWriter {
    out: String,
    indent: usize,
}

impl CWriter {
    pub fn new() -> Self {
        CWriter::default()
    }

    /// Write one line at the current indentation.
    pub fn line(&mut self, text: impl fmt::Display) -> fmt::Result {
        for _ in 0..self.indent {
            self.out.push('\t');
        }
        writeln!(self.out, "{}", text)
    }

    /// Write a preprocessor line, never indented.
    pub fn directive(&mut self, text: impl fmt::Display) -> fmt::Result {
        writeln!(self.out, "{}", text)
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Open a `{` block on its own line and indent.
    pub fn open(&mut self) -> fmt::Result {
        self.line("{")?;
        self.indent += 1;
        Ok(())
    }

    /// Close the innermost block.
    pub fn close(&mut self) -> fmt::Result {
        self.indent = self.indent.saturating_sub(1);
        self.line("}")
    }

    /// `/* ... */` comment, one output line per input line.
    pub fn comment(&mut self, text: &str) -> fmt::Result {
        self.directive("/*")?;
        for line in text.lines() {
            if line.is_empty() {
                self.blank();
            } else {
                self.directive(format_args!(" * {}", line))?;
            }
        }
        self.directive(" */")
    }

    /// Run `body` inside `#ifdef guard` when a guard is given.
    pub fn guarded<F>(&mut self, guard: Option<&str>, body: F) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        match guard {
            Some(guard) => {
                self.directive(format_args!("#ifdef {}", guard))?;
                body(self)?;
                self.directive("#endif")
            }
            None => body(self),
        }
    }

    /// `extern "C"` opener for C++ consumers.
    pub fn begin_extern_c(&mut self) -> fmt::Result {
        self.directive("#ifdef __cplusplus")?;
        self.directive("extern \"C\"")?;
        self.directive("{")?;
        self.directive("#endif")?;
        self.blank();
        Ok(())
    }

    pub fn end_extern_c(&mut self) -> fmt::Result {
        self.directive("#ifdef __cplusplus")?;
        self.directive("}")?;
        self.directive("#endif")?;
        self.blank();
        Ok(())
    }

    pub fn finish(self) -> String {
        self.out
    }
}
