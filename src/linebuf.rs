//! Incremental byte-stream-to-line parsing.
//!
//! [`LineAccumulator`] turns the chunked, arbitrarily-split output of a
//! child process into whole lines. It is deliberately *not* a queue: only
//! the most recently completed line is retained, because the bar only ever
//! displays the latest value. A command that prints several lines between
//! two redraws will have all but the last discarded.
//!
//! The buffer is bounded. When a chatty child never prints a newline, the
//! buffer content is force-flushed as a line once it is within one byte of
//! capacity, so memory stays bounded and the reader never deadlocks.

/// Bounded accumulator that extracts the latest complete line from a byte
/// stream.
#[derive(Debug)]
pub struct LineAccumulator {
    /// Bytes not yet attributed to a completed line.
    buffer: Vec<u8>,
    /// Text of the most recently completed line, newline stripped.
    last_line: String,
    capacity: usize,
}

impl LineAccumulator {
    /// Create an accumulator holding at most `capacity` pending bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity.min(4096)),
            last_line: String::new(),
            capacity,
        }
    }

    /// Feed a chunk of bytes.
    ///
    /// Bytes beyond the remaining buffer capacity are dropped. If the chunk
    /// completes one or more lines, the text between the last two newlines
    /// becomes the new current line and any trailing partial line is kept
    /// for the next feed. If no newline has arrived by the time the buffer
    /// is within one byte of capacity, the whole buffer becomes the current
    /// line verbatim (lossy forced flush).
    pub fn feed(&mut self, bytes: &[u8]) {
        let room = self.capacity.saturating_sub(self.buffer.len());
        let take = bytes.len().min(room);
        self.buffer.extend_from_slice(&bytes[..take]);

        match self.buffer.iter().rposition(|&b| b == b'\n') {
            Some(last_nl) => {
                let line_start = self.buffer[..last_nl]
                    .iter()
                    .rposition(|&b| b == b'\n')
                    .map(|i| i + 1)
                    .unwrap_or(0);
                self.last_line =
                    String::from_utf8_lossy(&self.buffer[line_start..last_nl]).into_owned();
                self.buffer.drain(..=last_nl);
            }
            None => {
                if self.buffer.len() + 1 >= self.capacity {
                    self.last_line = String::from_utf8_lossy(&self.buffer).into_owned();
                    self.buffer.clear();
                }
            }
        }
    }

    /// The most recently completed line. Unchanged until the next completed
    /// line overwrites it.
    pub fn current_line(&self) -> &str {
        &self.last_line
    }

    /// Number of pending (not yet line-terminated) bytes.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_is_extracted() {
        let mut acc = LineAccumulator::new(64);
        acc.feed(b"hello\n");
        assert_eq!(acc.current_line(), "hello");
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn line_split_across_feeds() {
        let mut acc = LineAccumulator::new(64);
        acc.feed(b"hel");
        assert_eq!(acc.current_line(), "");
        acc.feed(b"lo\n");
        assert_eq!(acc.current_line(), "hello");
    }

    #[test]
    fn latest_line_wins() {
        // Intentional: older unconsumed lines are discarded, the bar only
        // shows the newest value.
        let mut acc = LineAccumulator::new(64);
        acc.feed(b"one\ntwo\nthree\n");
        assert_eq!(acc.current_line(), "three");
    }

    #[test]
    fn partial_line_after_newline_is_retained() {
        let mut acc = LineAccumulator::new(64);
        acc.feed(b"done\npart");
        assert_eq!(acc.current_line(), "done");
        assert_eq!(acc.pending(), 4);
        acc.feed(b"ial\n");
        assert_eq!(acc.current_line(), "partial");
    }

    #[test]
    fn current_line_is_text_between_last_two_newlines() {
        let mut acc = LineAccumulator::new(256);
        acc.feed(b"a\nbb\nccc\ndd");
        assert_eq!(acc.current_line(), "ccc");
        assert_eq!(acc.pending(), 2);
    }

    #[test]
    fn overflow_forces_flush() {
        let mut acc = LineAccumulator::new(8);
        acc.feed(b"abcdefg"); // 7 bytes, capacity 8: within one byte
        assert_eq!(acc.current_line(), "abcdefg");
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn bytes_beyond_capacity_are_dropped() {
        let mut acc = LineAccumulator::new(8);
        acc.feed(b"0123456789abcdef");
        // Truncated to 8 bytes, then force-flushed.
        assert_eq!(acc.current_line(), "01234567");
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn repeated_no_newline_feeds_stay_bounded() {
        let mut acc = LineAccumulator::new(16);
        for _ in 0..1000 {
            acc.feed(b"xxxx");
        }
        assert!(acc.pending() < 16);
    }

    #[test]
    fn newline_only_yields_empty_line() {
        let mut acc = LineAccumulator::new(64);
        acc.feed(b"value\n");
        acc.feed(b"\n");
        assert_eq!(acc.current_line(), "");
    }

    #[test]
    fn empty_feed_is_a_no_op() {
        let mut acc = LineAccumulator::new(64);
        acc.feed(b"keep\n");
        acc.feed(b"");
        assert_eq!(acc.current_line(), "keep");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_panicked_on() {
        let mut acc = LineAccumulator::new(64);
        acc.feed(&[0xff, 0xfe, b'\n']);
        assert_eq!(acc.current_line(), "\u{fffd}\u{fffd}");
    }
}
