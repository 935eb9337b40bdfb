//! Stateful UTF-8 decoding across chunk boundaries.
//!
//! The answer stream is raw UTF-8 with arbitrary chunk boundaries, so a
//! multi-byte character can be split between two chunks. The accumulator
//! holds the incomplete tail of each chunk and prepends it to the next,
//! which a per-chunk lossy decode would instead corrupt into U+FFFD.

/// Incremental UTF-8 decoder carrying partial sequences between chunks.
#[derive(Debug, Default)]
pub struct Utf8Accumulator {
    pending: Vec<u8>,
}

impl Utf8Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, returning all text that is complete so far.
    ///
    /// Genuinely invalid sequences decode to U+FFFD; an incomplete tail is
    /// held back for the next chunk.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let buf = std::mem::take(&mut self.pending);

        let mut out = String::new();
        let mut start = 0;
        while start < buf.len() {
            match std::str::from_utf8(&buf[start..]) {
                Ok(s) => {
                    out.push_str(s);
                    start = buf.len();
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    // The slice up to valid_up_to is complete UTF-8.
                    out.push_str(&String::from_utf8_lossy(&buf[start..start + valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push('\u{FFFD}');
                            start += valid + len;
                        }
                        None => {
                            // Incomplete sequence at the end: keep for next chunk.
                            self.pending = buf[start + valid..].to_vec();
                            return out;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush any held-back bytes at stream end (lossy: the stream ended
    /// mid-character, so there is nothing more to wait for).
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}
