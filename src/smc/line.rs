//! Bounded accumulator for one inbound reply line.
//!
//! Bytes arrive one at a time across any number of ticks. `\r` is dropped,
//! `\n` completes the line. A line longer than the capacity is an overflow:
//! the byte that would not fit is never stored.

pub const CARRIAGE_RETURN: u8 = b'\r';
pub const NEW_LINE: u8 = b'\n';

/// Outcome of feeding one byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    Pending,
    Complete(String),
    /// Carries what was accumulated before the limit was hit.
    Overflow(String),
}

#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    capacity: usize,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, byte: u8) -> LineEvent {
        match byte {
            CARRIAGE_RETURN => LineEvent::Pending,
            NEW_LINE => LineEvent::Complete(self.take()),
            _ if self.buf.len() >= self.capacity => LineEvent::Overflow(self.take()),
            _ => {
                self.buf.push(byte);
                LineEvent::Pending
            }
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn take(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(buffer: &mut LineBuffer, bytes: &[u8]) -> Vec<LineEvent> {
        bytes
            .iter()
            .map(|&b| buffer.push(b))
            .filter(|e| *e != LineEvent::Pending)
            .collect()
    }

    #[test]
    fn crlf_terminates_line() {
        let mut buffer = LineBuffer::new(32);
        assert_eq!(
            feed(&mut buffer, b"1TP5.000000\r\n"),
            vec![LineEvent::Complete("1TP5.000000".into())]
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn bare_newline_terminates_line() {
        let mut buffer = LineBuffer::new(32);
        assert_eq!(
            feed(&mut buffer, b"1MM0\n"),
            vec![LineEvent::Complete("1MM0".into())]
        );
    }

    #[test]
    fn partial_line_survives_between_feeds() {
        let mut buffer = LineBuffer::new(32);
        assert!(feed(&mut buffer, b"1TS00").is_empty());
        assert_eq!(buffer.len(), 5);
        assert_eq!(
            feed(&mut buffer, b"0033\r\n"),
            vec![LineEvent::Complete("1TS000033".into())]
        );
    }

    #[test]
    fn line_exactly_at_capacity_is_accepted() {
        let mut buffer = LineBuffer::new(8);
        assert_eq!(
            feed(&mut buffer, b"12345678\n"),
            vec![LineEvent::Complete("12345678".into())]
        );
    }

    #[test]
    fn one_byte_past_capacity_overflows_without_storing_it() {
        let mut buffer = LineBuffer::new(8);
        let events = feed(&mut buffer, b"123456789");
        assert_eq!(events, vec![LineEvent::Overflow("12345678".into())]);
        assert!(buffer.is_empty());
    }
}
