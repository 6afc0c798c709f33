use std::{io::Read, num::NonZeroUsize};

use crate::tokenizer::{Token, Tokenizer};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Invalid UTF-8 in source at byte {0}")]
    InvalidUtf8(usize),
    #[error("Source ends inside a UTF-8 sequence")]
    TruncatedUtf8,
}

/// Turns byte chunks into text chunks, carrying an incomplete UTF-8 sequence
/// at the end of one chunk over to the next.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    carry: Vec<u8>,
    offset: usize,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> Result<String, SourceError> {
        self.carry.extend_from_slice(bytes);
        let valid = match std::str::from_utf8(&self.carry) {
            Ok(_) => self.carry.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => return Err(SourceError::InvalidUtf8(self.offset + e.valid_up_to())),
        };

        let rest = self.carry.split_off(valid);
        let text = std::mem::replace(&mut self.carry, rest);
        let text = String::from_utf8(text)
            .map_err(|e| SourceError::InvalidUtf8(self.offset + e.utf8_error().valid_up_to()))?;
        self.offset += valid;
        Ok(text)
    }

    pub fn finish(&mut self) -> Result<(), SourceError> {
        if self.carry.is_empty() {
            Ok(())
        } else {
            Err(SourceError::TruncatedUtf8)
        }
    }
}

/// Reads `reader` in chunks of `chunk_size` bytes and tokenizes each chunk
/// as it arrives. The result ends with the end-of-input token.
pub fn tokenize_reader(
    mut reader: impl Read,
    chunk_size: NonZeroUsize,
) -> Result<Vec<Token>, SourceError> {
    let mut tokenizer = Tokenizer::new();
    let mut decoder = ChunkDecoder::new();
    let mut buffer = vec![0; chunk_size.get()];
    let mut tokens = Vec::new();

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        let text = decoder.decode(&buffer[..read])?;
        tokens.extend(tokenizer.tokenize(&text));
    }

    decoder.finish()?;
    tokens.extend(tokenizer.eof());
    Ok(tokens)
}
