use bytes::{Buf, Bytes, BytesMut};

/// Reassembles lines from chunks whose boundaries don't follow line boundaries.
///
/// Accepts `\n`, `\r` and `\r\n` as terminators. After all complete lines are taken,
/// only the trailing incomplete line stays in the buffer.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buffer: BytesMut,
    // last line ended with `\r` at the very end of a chunk, a leading `\n` of the next one belongs to it
    skip_lf: bool,
}

impl LineBuffer {
    pub fn put(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete line, without its terminator
    pub fn next_line(&mut self) -> Option<Bytes> {
        if self.skip_lf && !self.buffer.is_empty() {
            if self.buffer.first() == Some(&b'\n') {
                self.buffer.advance(1);
            }
            self.skip_lf = false;
        }

        let end = self.buffer.iter().position(|b| *b == b'\n' || *b == b'\r')?;

        let line = self.buffer.split_to(end).freeze();

        let is_cr = self.buffer.first() == Some(&b'\r');
        self.buffer.advance(1);

        if is_cr {
            match self.buffer.first() {
                Some(b'\n') => self.buffer.advance(1),
                Some(_) => {}
                None => self.skip_lf = true,
            }
        }

        Some(line)
    }

    /// bytes of the incomplete line waiting for more data
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
