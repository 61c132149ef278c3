// * Streaming <title> scanner
// * Byte-level state machine so a page never has to be buffered or parsed as a whole

use crate::config::constants::MAX_TITLE_BYTES;
use crate::network::{ByteStream, NetworkError};
use crate::ops::telemetry;
use encoding_rs::Encoding;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

const TITLE_TAG: &[u8] = b"<title>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekingTag,
    ReadingTitle,
    Found,
    Exhausted,
}

/// Incremental scanner fed with arbitrary chunks of a document.
///
/// The opening tag is matched case-insensitively with whitespace allowed between
/// `<` and `title`. A mismatch resets the match cursor. Once the tag is matched,
/// bytes are collected until the next `<` or the end of the stream. Only the
/// search for the opening tag is bounded by `limit`; the title itself is bounded
/// by a fixed cap. Collected bytes are decoded with the page's declared encoding.
#[derive(Debug)]
pub struct TitleScanner {
    limit: usize,
    encoding: &'static Encoding,
    consumed: usize,
    cursor: usize,
    state: ScanState,
    buffer: Vec<u8>,
}

impl TitleScanner {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            encoding: encoding_rs::UTF_8,
            consumed: 0,
            cursor: 0,
            state: ScanState::SeekingTag,
            buffer: Vec::new(),
        }
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Feeds a chunk. Returns true once no further input can change the result.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        for &byte in chunk {
            match self.state {
                ScanState::SeekingTag => self.seek(byte),
                ScanState::ReadingTitle => self.read(byte),
                ScanState::Found | ScanState::Exhausted => break,
            }
        }
        self.is_done()
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, ScanState::Found | ScanState::Exhausted)
    }

    /// Bytes examined while looking for the opening tag
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Raw title text, trimmed. None when no opening tag was seen or the title is blank.
    pub fn finish(self) -> Option<String> {
        match self.state {
            ScanState::ReadingTitle | ScanState::Found => {
                // * Malformed sequences become U+FFFD, including a character cut by the cap
                let (decoded, _) = self.encoding.decode_without_bom_handling(&self.buffer);
                let title = decoded.trim().to_string();
                (!title.is_empty()).then_some(title)
            }
            ScanState::SeekingTag | ScanState::Exhausted => None,
        }
    }

    fn seek(&mut self, byte: u8) {
        if self.consumed >= self.limit {
            self.state = ScanState::Exhausted;
            return;
        }
        self.consumed += 1;

        // * Whitespace is allowed between '<' and the tag name
        if self.cursor == 1 && byte.is_ascii_whitespace() {
            return;
        }

        if byte.to_ascii_lowercase() == TITLE_TAG[self.cursor] {
            self.cursor += 1;
            if self.cursor == TITLE_TAG.len() {
                self.state = ScanState::ReadingTitle;
            }
        } else {
            self.cursor = usize::from(byte == b'<');
        }
    }

    fn read(&mut self, byte: u8) {
        if byte == b'<' || self.buffer.len() >= MAX_TITLE_BYTES {
            self.state = ScanState::Found;
        } else {
            self.buffer.push(byte);
        }
    }
}

/// Scans a complete in-memory document.
pub fn scan_title(document: &[u8], limit: usize) -> Option<String> {
    let mut scanner = TitleScanner::new(limit);
    scanner.feed(document);
    scanner.finish()
}

/// Drives a scanner over a body stream, aborting as soon as `token` is cancelled.
///
/// The stream is dropped on return, which closes the underlying connection.
pub async fn scan_stream(
    mut body: ByteStream,
    limit: usize,
    encoding: &'static Encoding,
    token: &CancellationToken,
) -> Result<Option<String>, NetworkError> {
    let mut scanner = TitleScanner::new(limit).with_encoding(encoding);

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(NetworkError::Cancelled),
            chunk = body.next() => chunk,
        };

        let Some(chunk) = next else { break };
        let chunk = chunk?;

        if token.is_cancelled() {
            return Err(NetworkError::Cancelled);
        }
        if scanner.feed(&chunk) {
            break;
        }
    }

    telemetry::record_bytes_scanned(scanner.consumed() as u64);
    Ok(scanner.finish())
}
