use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Bytes are buffered undecoded, since a chunk boundary may fall in the
/// middle of a multi-byte character.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain complete events from the buffer before reading more.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                // Abort if no more data available.
                None => return Ok(None),
            }
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // For `end-of-line`, we only handle line feed (a trailing carriage
        // return of a line is stripped). Comments are skipped, and for
        // fields we only care about `data`.
        //
        // event         = *( comment / field ) end-of-line
        // comment       = colon *any-char end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        loop {
            let Some(eol_idx) = self.buf.windows(2).position(|w| w == b"\n\n")
            else {
                return Ok(None);
            };

            // Consume the bytes from the buffer.
            let raw: Vec<u8> = self.buf.drain(0..eol_idx + 2).collect();
            let Ok(raw) = str::from_utf8(&raw[..eol_idx]) else {
                return Err(Error::InvalidPayload);
            };

            let mut data_lines = Vec::new();
            for line in raw.split('\n') {
                let line = line.strip_suffix('\r').unwrap_or(line);
                if line.starts_with(':') {
                    continue;
                }
                let Some((field, value)) = line.split_once(':') else {
                    return Err(Error::InvalidPayload);
                };
                let value = value.strip_prefix(' ').unwrap_or(value);
                match field {
                    "data" => data_lines.push(value),
                    "event" | "id" | "retry" => {}
                    _ => return Err(Error::InvalidPayload),
                }
            }

            if !data_lines.is_empty() {
                return Ok(Some(data_lines.join("\n")));
            }
            // A comment-only event (e.g. keep-alive), look for the next one.
        }
    }
}
