//! Captured output streams.

use wasmtime_wasi::pipe::MemoryOutputPipe;

/// Forward-only reader over an in-memory stream written by a module.
///
/// The module appends to the underlying pipe; every read returns what was
/// appended since the previous read. The same bytes are never returned twice.
#[derive(Debug, Clone)]
pub struct CapturedStream {
    pipe: MemoryOutputPipe,
    cursor: usize,
}

impl CapturedStream {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            pipe: MemoryOutputPipe::new(capacity),
            cursor: 0,
        }
    }

    /// The write end handed to the WASI context.
    pub(crate) fn pipe(&self) -> MemoryOutputPipe {
        self.pipe.clone()
    }

    /// Returns everything written since the last read and advances the cursor.
    ///
    /// Invalid UTF-8 is replaced rather than rejected, since the text is
    /// diagnostic.
    pub fn read_to_string(&mut self) -> String {
        let contents = self.pipe.contents();
        let start = self.cursor.min(contents.len());
        let text = String::from_utf8_lossy(&contents[start..]).into_owned();
        self.cursor = contents.len();
        text
    }

    /// Bytes written but not yet read.
    pub fn pending(&self) -> usize {
        self.pipe.contents().len().saturating_sub(self.cursor)
    }

    /// Bytes written over the module's lifetime.
    pub fn total_written(&self) -> usize {
        self.pipe.contents().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_stream_is_empty() {
        let mut stream = CapturedStream::new(1024);
        assert_eq!(stream.pending(), 0);
        assert_eq!(stream.total_written(), 0);
        assert_eq!(stream.read_to_string(), "");
    }
}
