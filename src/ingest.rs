// Chunked input reading

use std::io::{ErrorKind, Read};

/// Bytes handed to the decoder per step unless configured otherwise
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Reads a source in fixed-size chunks; only the last chunk may be shorter
pub struct ReaderChunks<R> {
    reader: R,
    buffer: Vec<u8>,
    done: bool,
}

impl<R: Read> ReaderChunks<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        ReaderChunks {
            reader,
            buffer: vec![0; chunk_size.max(1)],
            done: false,
        }
    }

    /// Next chunk of input, `None` at end of input
    pub fn next_chunk(&mut self) -> std::io::Result<Option<&[u8]>> {
        if self.done {
            return Ok(None);
        }

        let mut filled = 0;
        while filled < self.buffer.len() {
            match self.reader.read(&mut self.buffer[filled..]) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if filled == 0 {
            Ok(None)
        } else {
            Ok(Some(&self.buffer[..filled]))
        }
    }
}
