//! Tool wire protocol: JSON-RPC 2.0 envelopes framed as newline-delimited
//! compact JSON over a subprocess's standard streams.
//!
//! A tool process receives one framed request on stdin and writes exactly one
//! framed response on stdout. The codec here handles encoding, streaming
//! decode with per-stream accumulation, request/response correlation, and
//! argument validation against a tool's declared input schema.
//!
//! # Example
//!
//! ```
//! use wire::{FrameDecoder, RequestId, ToolCallRequest, decode_response, encode_request};
//!
//! let request = ToolCallRequest {
//!     id: RequestId::Number(1),
//!     tool_name: "calculate_sum".to_string(),
//!     arguments: serde_json::json!({"a": 2, "b": 2}),
//! };
//! let frame = encode_request(&request)?;
//! assert!(frame.ends_with(b"\n"));
//!
//! let mut decoder = FrameDecoder::new();
//! decoder.feed(br#"{"jsonrpc":"2.0","id":1,"result":{"sum":4}}"#)?;
//! decoder.feed(b"\n")?;
//! let reply = decoder.next_frame().expect("complete frame");
//! let payload = decode_response(&reply, &request.id)?;
//! assert_eq!(payload["sum"], 4);
//! # Ok::<(), wire::Error>(())
//! ```

mod codec;
mod error;
mod protocol;
mod schema;

pub use codec::{FrameDecoder, MAX_FRAME_SIZE, decode_response, encode_request};
pub use error::{Error, Result};
pub use protocol::{
    CALL_METHOD, CallParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
    ToolCallRequest, ToolDefinition,
};
pub use schema::validate_arguments;
