//! Frame encoding and streaming decode.
//!
//! Frames are newline-delimited compact JSON: one JSON-RPC envelope per line.
//! Compact serialization escapes newlines inside strings, so the delimiter
//! never collides with message data.

use crate::error::{Error, Result};
use crate::protocol::{CALL_METHOD, CallParams, JsonRpcRequest, JsonRpcResponse, ToolCallRequest};
use serde_json::Value;

/// Maximum accepted frame size (1MB).
/// Sized for large tool outputs (file reads, search results).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Encode a tool-call request as one outbound frame (trailing newline).
pub fn encode_request(request: &ToolCallRequest) -> Result<Vec<u8>> {
    let envelope = JsonRpcRequest::new(request.id.clone(), CALL_METHOD).with_params(CallParams {
        name: request.tool_name.clone(),
        arguments: request.arguments.clone(),
    });

    let mut bytes = serde_json::to_vec(&envelope)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode one complete frame into a response payload, enforcing correlation.
///
/// A missing or mismatched id is a protocol error, never silently ignored.
/// Decoding the same bytes twice yields the same result.
pub fn decode_response(frame: &[u8], expected_id: &crate::protocol::RequestId) -> Result<Value> {
    let response: JsonRpcResponse =
        serde_json::from_slice(frame).map_err(|e| Error::MalformedFrame {
            detail: e.to_string(),
            raw: frame.to_vec(),
        })?;

    match &response.id {
        Some(id) if id == expected_id => {}
        Some(id) => {
            return Err(Error::IdMismatch {
                expected: expected_id.to_string(),
                got: id.to_string(),
            });
        }
        None => {
            return Err(Error::MissingId {
                expected: expected_id.to_string(),
            });
        }
    }

    response.into_result().map_err(Error::Remote)
}

/// Streaming frame accumulator for one subprocess's stdout.
///
/// A tool may write its response incrementally; `feed` appends whatever bytes
/// arrived and `next_frame` yields a frame only once a full delimiter has been
/// observed. The buffer is the decoder's only state.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the stream.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge {
                size: self.buf.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        Ok(())
    }

    /// Pop the next complete frame, if a delimiter has been seen.
    ///
    /// Empty lines (bare delimiters) are skipped rather than yielded.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let pos = self.buf.iter().position(|&b| b == b'\n')?;
            let mut frame: Vec<u8> = self.buf.drain(..=pos).collect();
            frame.pop(); // delimiter
            if frame.iter().any(|b| !b.is_ascii_whitespace()) {
                return Some(frame);
            }
        }
    }

    /// Bytes accumulated without a complete frame. Preserved for audit when
    /// a process exits mid-frame.
    pub fn residual(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestId;
    use serde_json::json;

    fn request() -> ToolCallRequest {
        ToolCallRequest {
            id: RequestId::Number(7),
            tool_name: "calculate_sum".into(),
            arguments: json!({"a": 2, "b": 40}),
        }
    }

    #[test]
    fn encoded_frame_is_one_line() {
        let bytes = encode_request(&request()).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);
    }

    #[test]
    fn round_trip_request() {
        let bytes = encode_request(&request()).unwrap();
        let envelope: JsonRpcRequest = serde_json::from_slice(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(envelope.method, CALL_METHOD);
        assert_eq!(envelope.id, RequestId::Number(7));
        let params: CallParams = serde_json::from_value(envelope.params.unwrap()).unwrap();
        assert_eq!(params.name, "calculate_sum");
        assert_eq!(params.arguments, json!({"a": 2, "b": 40}));
    }

    #[test]
    fn newline_inside_string_stays_escaped() {
        let req = ToolCallRequest {
            id: RequestId::Number(1),
            tool_name: "echo".into(),
            arguments: json!({"text": "line one\nline two"}),
        };
        let bytes = encode_request(&req).unwrap();
        // Only the trailing delimiter is a raw newline.
        assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);
    }

    #[test]
    fn decoder_waits_for_delimiter() {
        let mut dec = FrameDecoder::new();
        dec.feed(br#"{"jsonrpc":"2.0","#).unwrap();
        assert!(dec.next_frame().is_none());
        dec.feed(b"\"id\":1,\"result\":null}\n").unwrap();
        let frame = dec.next_frame().unwrap();
        assert!(frame.ends_with(b"}"));
        assert!(dec.next_frame().is_none());
    }

    #[test]
    fn decoder_splits_multiple_frames() {
        let mut dec = FrameDecoder::new();
        dec.feed(b"{\"a\":1}\n\n{\"b\":2}\n").unwrap();
        assert_eq!(dec.next_frame().unwrap(), b"{\"a\":1}");
        assert_eq!(dec.next_frame().unwrap(), b"{\"b\":2}");
        assert!(dec.next_frame().is_none());
        assert!(dec.residual().is_empty());
    }

    #[test]
    fn decoder_rejects_oversized_frame() {
        let mut dec = FrameDecoder::new();
        let res = dec.feed(&vec![b'x'; MAX_FRAME_SIZE + 1]);
        assert!(matches!(res, Err(Error::FrameTooLarge { .. })));
    }

    #[test]
    fn decode_rejects_mismatched_id() {
        let frame = br#"{"jsonrpc":"2.0","id":99,"result":{}}"#;
        let err = decode_response(frame, &RequestId::Number(7)).unwrap_err();
        assert!(matches!(err, Error::IdMismatch { .. }));
    }

    #[test]
    fn decode_rejects_missing_id() {
        let frame = br#"{"jsonrpc":"2.0","result":{}}"#;
        let err = decode_response(frame, &RequestId::Number(7)).unwrap_err();
        assert!(matches!(err, Error::MissingId { .. }));
    }

    #[test]
    fn decode_is_idempotent() {
        let frame = br#"{"jsonrpc":"2.0","id":7,"result":{"sum":42}}"#;
        let first = decode_response(frame, &RequestId::Number(7)).unwrap();
        let second = decode_response(frame, &RequestId::Number(7)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, json!({"sum": 42}));
    }

    #[test]
    fn malformed_frame_preserves_raw_bytes() {
        let frame = b"not json at all";
        match decode_response(frame, &RequestId::Number(1)).unwrap_err() {
            Error::MalformedFrame { raw, .. } => assert_eq!(raw, frame),
            other => panic!("unexpected error: {other}"),
        }
    }
}
