//! Diagnostic channel — non-fatal messages on a side channel distinct
//! from the main output.
//!
//! Carries skip notices (binary, oversize, permission), the lens
//! manifest on start, the streaming-order notice, and the budget
//! report on end. Each message is a single line prefixed by a level
//! tag. The channel is a value passed through the options, never a
//! global logger, so two concurrent invocations cannot interleave.

use std::io::Write;

/// Severity of a diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Self::Info => "[info]",
            Self::Warn => "[warn]",
            Self::Error => "[error]",
        }
    }
}

/// Sink for diagnostic lines.
///
/// Write failures on the diagnostic channel are swallowed: losing a
/// skip notice must never abort a run whose main output is healthy.
pub struct Diagnostics<'a> {
    sink: Option<&'a mut dyn Write>,
}

impl<'a> Diagnostics<'a> {
    pub fn new(sink: &'a mut dyn Write) -> Self {
        Self { sink: Some(sink) }
    }

    /// A channel that discards everything. Used by the pure `process`
    /// surface and by tests that don't inspect diagnostics.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn info(&mut self, msg: &str) {
        self.emit(Level::Info, msg);
    }

    pub fn warn(&mut self, msg: &str) {
        self.emit(Level::Warn, msg);
    }

    pub fn error(&mut self, msg: &str) {
        self.emit(Level::Error, msg);
    }

    fn emit(&mut self, level: Level, msg: &str) {
        if let Some(sink) = self.sink.as_mut() {
            let _ = writeln!(sink, "{} {}", level.tag(), msg);
        }
    }
}

impl std::fmt::Debug for Diagnostics<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("connected", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_level_tags() {
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut diag = Diagnostics::new(&mut buf);
            diag.info("starting");
            diag.warn("skipped: binary");
            diag.error("config invalid");
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "[info] starting");
        assert_eq!(lines[1], "[warn] skipped: binary");
        assert_eq!(lines[2], "[error] config invalid");
    }

    #[test]
    fn disabled_discards() {
        let mut diag = Diagnostics::disabled();
        diag.info("nobody hears this");
    }
}
