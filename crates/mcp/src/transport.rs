//! Newline framing.
//!
//! [`LineCodec`] decodes raw lines (no UTF-8 or JSON interpretation; that is
//! the dispatcher's job, so a bad line only affects itself) and encodes each
//! [`Response`] as one JSON object followed by `\n`.

use crate::protocol::Response;
use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Lines longer than this are dropped.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024 * 1024;

/// Process stdin and stdout.
pub fn stdio() -> (tokio::io::Stdin, tokio::io::Stdout) {
    (tokio::io::stdin(), tokio::io::stdout())
}

#[derive(Debug, Clone)]
pub struct LineCodec {
    max_length: usize,
    /// Bytes of the buffer already searched for a newline.
    next_index: usize,
    /// Skipping the remainder of an over-long line.
    discarding: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn without_carriage_return(mut line: BytesMut) -> BytesMut {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line
}

impl Decoder for LineCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<BytesMut>, io::Error> {
        loop {
            let read_to = buf.len().min(self.max_length.saturating_add(1));
            let newline = buf[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    buf.advance(offset + self.next_index + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let end = offset + self.next_index;
                    self.next_index = 0;
                    let mut line = buf.split_to(end + 1);
                    line.truncate(end);
                    return Ok(Some(without_carriage_return(line)));
                }
                (false, None) if buf.len() > self.max_length => {
                    warn!(
                        max_length = self.max_length,
                        "input line exceeds maximum length; discarding it"
                    );
                    self.discarding = true;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<BytesMut>, io::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if self.discarding || buf.is_empty() {
            self.discarding = false;
            buf.clear();
            return Ok(None);
        }
        let line = buf.split_to(buf.len());
        Ok(Some(without_carriage_return(line)))
    }
}

impl Encoder<Response> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, response: Response, dst: &mut BytesMut) -> Result<(), io::Error> {
        let json = serde_json::to_vec(&response).map_err(io::Error::other)?;
        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LineCodec;
    use crate::protocol::Response;
    use bytes::BytesMut;
    use serde_json::json;
    use tokio_util::codec::{Decoder, Encoder};

    fn drain(codec: &mut LineCodec, input: &[u8]) -> Vec<Vec<u8>> {
        let mut buf = BytesMut::from(input);
        let mut lines = Vec::new();
        while let Some(line) = codec.decode(&mut buf).unwrap() {
            lines.push(line.to_vec());
        }
        while let Some(line) = codec.decode_eof(&mut buf).unwrap() {
            lines.push(line.to_vec());
        }
        lines
    }

    #[test]
    fn splits_on_newlines_and_strips_cr() {
        let mut codec = LineCodec::new();
        let lines = drain(&mut codec, b"{\"a\":1}\r\n\n{\"b\":2}\n{\"c\":3}");
        assert_eq!(
            lines,
            vec![
                b"{\"a\":1}".to_vec(),
                Vec::new(),
                b"{\"b\":2}".to_vec(),
                b"{\"c\":3}".to_vec(),
            ]
        );
    }

    #[test]
    fn waits_for_more_input() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"{\"id\":"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"1}\n");
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&line[..], b"{\"id\":1}");
    }

    #[test]
    fn discards_overlong_line_and_recovers() {
        let mut codec = LineCodec::with_max_length(8);
        let lines = drain(&mut codec, b"0123456789abcdef\nshort\n");
        assert_eq!(lines, vec![b"short".to_vec()]);
    }

    #[test]
    fn invalid_utf8_is_passed_through_as_bytes() {
        let mut codec = LineCodec::new();
        let lines = drain(&mut codec, b"\xff\xfe\n{}\n");
        assert_eq!(lines, vec![vec![0xff, 0xfe], b"{}".to_vec()]);
    }

    #[test]
    fn encodes_one_line_per_response() {
        let mut codec = LineCodec::new();
        let mut out = BytesMut::new();
        codec
            .encode(
                Response::success(Some(json!(1)), json!({"text": "a\nb"})),
                &mut out,
            )
            .unwrap();
        assert_eq!(&out[..], b"{\"id\":1,\"result\":{\"text\":\"a\\nb\"}}\n");
    }
}
