//! Output accumulation with bounded tail search for prompt detection.

use regex::bytes::Regex;

/// Accumulates raw channel output and looks for prompts near the end.
///
/// Prompt patterns are only searched within the last `search_depth`
/// bytes, which keeps detection cheap even when a command dumps an
/// entire running configuration.
#[derive(Debug)]
pub struct OutputBuffer {
    data: Vec<u8>,
    search_depth: usize,
}

impl OutputBuffer {
    /// Create a buffer that searches the last `search_depth` bytes for
    /// prompt patterns.
    pub fn new(search_depth: usize) -> Self {
        Self {
            data: Vec::with_capacity(4096),
            search_depth,
        }
    }

    /// Append a chunk of channel output.
    pub fn push(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    /// Whether `pattern` matches within the tail search window.
    pub fn prompt_seen(&self, pattern: &Regex) -> bool {
        let start = self.data.len().saturating_sub(self.search_depth);
        pattern.is_match(&self.data[start..])
    }

    /// Drain everything read so far as lossy UTF-8, resetting the buffer
    /// for the next command.
    pub fn drain_text(&mut self) -> String {
        String::from_utf8_lossy(&std::mem::take(&mut self.data)).into_owned()
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been buffered since the last drain.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
