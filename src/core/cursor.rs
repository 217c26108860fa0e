//! Bidirectional stream cursor
//!
//! Wraps a seekable byte source and exposes single-byte movement in both
//! directions. The stream's seek position is the only persistent state; the
//! cursor assumes exclusive ownership of reads and seeks for the stream's
//! lifetime.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// Single-byte cursor over a seekable byte stream.
///
/// Forward reads advance the position by one; `read_prev` returns the byte
/// immediately before the position and leaves the position on that byte, so
/// repeated calls walk backwards through the stream.
pub struct StreamCursor<S> {
    stream: S,
}

impl<S: Read + Seek> StreamCursor<S> {
    /// Create a cursor at the stream's current position.
    pub fn new(stream: S) -> Self {
        StreamCursor { stream }
    }

    /// Consume the cursor and return the wrapped stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Current position in the stream.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.stream.stream_position()?)
    }

    /// Read the byte at the cursor and advance past it.
    ///
    /// Returns `None` at end-of-stream.
    pub fn read(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Stream(e)),
            }
        }
    }

    /// Step back over the byte most recently returned by `read`, so the next
    /// `read` yields it again.
    pub fn unread(&mut self) -> Result<()> {
        self.stream.seek(SeekFrom::Current(-1))?;
        Ok(())
    }

    /// Read the byte immediately before the cursor and leave the cursor on
    /// that byte.
    ///
    /// Returns `None` at begin-of-stream.
    pub fn read_prev(&mut self) -> Result<Option<u8>> {
        if self.stream.stream_position()? == 0 {
            return Ok(None);
        }

        self.stream.seek(SeekFrom::Current(-1))?;

        let mut buf = [0u8; 1];
        self.stream.read_exact(&mut buf)?;

        self.stream.seek(SeekFrom::Current(-1))?;

        Ok(Some(buf[0]))
    }

    /// Step forward over the byte most recently returned by `read_prev`, so
    /// the next `read_prev` yields it again.
    pub fn unread_prev(&mut self) -> Result<()> {
        self.stream.seek(SeekFrom::Current(1))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn cursor(bytes: &[u8]) -> StreamCursor<Cursor<Vec<u8>>> {
        StreamCursor::new(Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn test_forward_read() {
        let mut c = cursor(b"ab");
        assert_eq!(c.read().unwrap(), Some(b'a'));
        assert_eq!(c.read().unwrap(), Some(b'b'));
        assert_eq!(c.read().unwrap(), None);
    }

    #[test]
    fn test_unread_rewinds_one_byte() {
        let mut c = cursor(b"ab");
        assert_eq!(c.read().unwrap(), Some(b'a'));
        c.unread().unwrap();
        assert_eq!(c.read().unwrap(), Some(b'a'));
        assert_eq!(c.read().unwrap(), Some(b'b'));
    }

    #[test]
    fn test_backward_walk_from_end() {
        let mut c = cursor(b"abc");
        // Drain forwards so the position sits at end-of-stream.
        while c.read().unwrap().is_some() {}

        assert_eq!(c.read_prev().unwrap(), Some(b'c'));
        assert_eq!(c.read_prev().unwrap(), Some(b'b'));
        assert_eq!(c.read_prev().unwrap(), Some(b'a'));
        assert_eq!(c.read_prev().unwrap(), None);
    }

    #[test]
    fn test_read_prev_leaves_cursor_on_byte() {
        let mut c = cursor(b"ab");
        while c.read().unwrap().is_some() {}

        assert_eq!(c.read_prev().unwrap(), Some(b'b'));
        // The cursor now sits on 'b', so a forward read yields it again.
        assert_eq!(c.read().unwrap(), Some(b'b'));
    }

    #[test]
    fn test_unread_prev_steps_forward() {
        let mut c = cursor(b"ab");
        while c.read().unwrap().is_some() {}

        assert_eq!(c.read_prev().unwrap(), Some(b'b'));
        assert_eq!(c.read_prev().unwrap(), Some(b'a'));
        c.unread_prev().unwrap();
        assert_eq!(c.read_prev().unwrap(), Some(b'a'));
    }

    #[test]
    fn test_read_prev_at_start() {
        let mut c = cursor(b"x");
        assert_eq!(c.read_prev().unwrap(), None);
        // Position is untouched; forward reading still works.
        assert_eq!(c.read().unwrap(), Some(b'x'));
    }

    #[test]
    fn test_direction_interleaving() {
        let mut c = cursor(b"abcd");
        assert_eq!(c.read().unwrap(), Some(b'a'));
        assert_eq!(c.read().unwrap(), Some(b'b'));
        assert_eq!(c.read_prev().unwrap(), Some(b'b'));
        assert_eq!(c.read_prev().unwrap(), Some(b'a'));
        assert_eq!(c.read().unwrap(), Some(b'a'));
    }
}
