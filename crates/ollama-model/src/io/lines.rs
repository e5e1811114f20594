use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading newline-delimited records from a chunk stream.
///
/// Blank lines are skipped, and a trailing record without a line feed is
/// still returned when the stream ends.
pub struct Lines {
    buf: Vec<u8>,
    chunks: Chunks,
    exhausted: bool,
}

impl Lines {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
            exhausted: false,
        }
    }

    pub async fn next_line(&mut self) -> Result<Option<String>, Error> {
        loop {
            if let Some(idx) = self.buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = self.buf.drain(0..idx + 1).collect();
                let line = decode(&raw[..idx])?;
                if line.trim().is_empty() {
                    continue;
                }
                return Ok(Some(line));
            }

            if self.exhausted {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let raw = std::mem::take(&mut self.buf);
                let line = decode(&raw)?;
                if line.trim().is_empty() {
                    return Ok(None);
                }
                return Ok(Some(line));
            }

            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.exhausted = true,
            }
        }
    }
}

#[inline]
fn decode(raw: &[u8]) -> Result<String, Error> {
    let Ok(s) = str::from_utf8(raw) else {
        return Err(Error::InvalidPayload);
    };
    Ok(s.strip_suffix('\r').unwrap_or(s).to_owned())
}
