//! Line routing of tool output into a leveled log sink.

use serde::Serialize;
use std::io;
use std::sync::{Arc, Mutex};

/// Prefix XJC uses for error lines
pub const ERROR_MARKER: &str = "[ERROR] ";

/// Prefix XJC uses for warning lines
pub const WARNING_MARKER: &str = "[WARNING] ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Destination for classified tool output
pub trait LogSink: Send + Sync {
    fn log(&self, severity: Severity, message: &str);
}

/// Forwards tool output to `tracing` under the `xjc` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => tracing::error!(target: "xjc", "{}", message),
            Severity::Warning => tracing::warn!(target: "xjc", "{}", message),
            Severity::Info => tracing::info!(target: "xjc", "{}", message),
        }
    }
}

/// Keeps every message in memory, in arrival order
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    messages: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

impl LogSink for CollectingSink {
    fn log(&self, severity: Severity, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((severity, message.to_string()));
        }
    }
}

/// Classify one complete line, stripping the marker if present
pub fn classify(line: &str) -> (Severity, &str) {
    if let Some(rest) = line.strip_prefix(ERROR_MARKER) {
        (Severity::Error, rest)
    } else if let Some(rest) = line.strip_prefix(WARNING_MARKER) {
        (Severity::Warning, rest)
    } else {
        (Severity::Info, line)
    }
}

/// Buffers raw bytes and forwards each complete line to a [`LogSink`].
///
/// Bytes after the last `\n` are forwarded when the router is finished or
/// dropped. `flush` never emits a partial line.
pub struct OutputRouter {
    sink: Arc<dyn LogSink>,
    buffer: Vec<u8>,
    lines: usize,
}

impl OutputRouter {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            buffer: Vec::new(),
            lines: 0,
        }
    }

    /// Number of lines forwarded so far
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Forward any trailing partial line and return the total line count
    pub fn finish(mut self) -> usize {
        self.emit_remaining();
        self.lines
    }

    fn emit_remaining(&mut self) {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.emit(&line);
        }
    }

    fn emit(&mut self, raw: &[u8]) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);
        let (severity, message) = classify(&line);
        self.sink.log(severity, message);
        self.lines += 1;
    }
}

impl io::Write for OutputRouter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut rest = buf;
        while let Some(newline) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(newline);
            if self.buffer.is_empty() {
                self.emit(head);
            } else {
                self.buffer.extend_from_slice(head);
                let line = std::mem::take(&mut self.buffer);
                self.emit(&line);
            }
            rest = &tail[1..];
        }
        self.buffer.extend_from_slice(rest);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for OutputRouter {
    fn drop(&mut self) {
        self.emit_remaining();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn router() -> (OutputRouter, CollectingSink) {
        let sink = CollectingSink::new();
        (OutputRouter::new(Arc::new(sink.clone())), sink)
    }

    #[test]
    fn test_classify_markers() {
        assert_eq!(classify("[ERROR] bad thing"), (Severity::Error, "bad thing"));
        assert_eq!(classify("[WARNING] careful"), (Severity::Warning, "careful"));
        assert_eq!(classify("plain info"), (Severity::Info, "plain info"));
        // marker must be followed by a space
        assert_eq!(classify("[ERROR]x"), (Severity::Info, "[ERROR]x"));
    }

    #[test]
    fn test_lines_split_across_writes() {
        let (mut router, sink) = router();
        router.write_all(b"[ERR").unwrap();
        router.write_all(b"OR] bad ").unwrap();
        router.write_all(b"thing\nplain").unwrap();
        router.write_all(b" info\n").unwrap();

        assert_eq!(router.finish(), 2);
        assert_eq!(
            sink.messages(),
            vec![
                (Severity::Error, "bad thing".to_string()),
                (Severity::Info, "plain info".to_string()),
            ]
        );
    }

    #[test]
    fn test_trailing_bytes_flushed_on_finish() {
        let (mut router, sink) = router();
        router.write_all(b"first\n[WARNING] last").unwrap();
        router.flush().unwrap();
        assert_eq!(sink.messages().len(), 1);

        router.finish();
        assert_eq!(
            sink.messages()[1],
            (Severity::Warning, "last".to_string())
        );
    }

    #[test]
    fn test_trailing_bytes_flushed_on_drop() {
        let (mut router, sink) = router();
        router.write_all(b"dangling").unwrap();
        drop(router);
        assert_eq!(sink.messages(), vec![(Severity::Info, "dangling".to_string())]);
    }

    #[test]
    fn test_crlf_and_empty_lines() {
        let (mut router, sink) = router();
        router.write_all(b"one\r\n\r\ntwo\n").unwrap();
        router.finish();

        let messages: Vec<String> = sink.messages().into_iter().map(|(_, m)| m).collect();
        assert_eq!(messages, vec!["one", "", "two"]);
    }

    #[test]
    fn test_multibyte_split_across_writes() {
        let (mut router, sink) = router();
        let text = "généré\n".as_bytes();
        router.write_all(&text[..2]).unwrap();
        router.write_all(&text[2..]).unwrap();
        router.finish();

        assert_eq!(sink.messages()[0].1, "généré");
    }
}
