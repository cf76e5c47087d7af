/// Incremental UTF-8 decoder with an optional character budget.
///
/// Chunks may split multi-byte sequences; incomplete tails are held back until
/// the next chunk. Invalid sequences become U+FFFD exactly as
/// `String::from_utf8_lossy` would replace them.
pub(crate) struct TextAccumulator {
    text: String,
    pending: Vec<u8>,
    remaining: Option<usize>,
}

impl TextAccumulator {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            text: String::new(),
            pending: Vec::new(),
            remaining: limit,
        }
    }

    pub fn is_full(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Decodes `chunk`. Returns true once the character budget is exhausted.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        let mut pending = std::mem::take(&mut self.pending);
        pending.extend_from_slice(chunk);

        let mut consumed = 0;
        while consumed < pending.len() && !self.is_full() {
            let rest = &pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    self.append(s);
                    consumed = pending.len();
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(s) = std::str::from_utf8(&rest[..valid]) {
                        self.append(s);
                    }
                    consumed += valid;
                    match e.error_len() {
                        Some(bad) => {
                            self.append("\u{FFFD}");
                            consumed += bad;
                        }
                        // Incomplete sequence, wait for more bytes
                        None => break,
                    }
                }
            }
        }

        pending.drain(..consumed);
        self.pending = pending;
        self.is_full()
    }

    fn append(&mut self, s: &str) {
        let Some(remaining) = self.remaining.as_mut() else {
            self.text.push_str(s);
            return;
        };

        for c in s.chars() {
            if *remaining == 0 {
                break;
            }
            self.text.push(c);
            *remaining -= 1;
        }
    }

    /// Finishes decoding; a dangling incomplete sequence becomes one U+FFFD.
    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() && !self.is_full() {
            self.append("\u{FFFD}");
        }
        self.text
    }
}
