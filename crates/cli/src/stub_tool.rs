//! Reference tool executable for exercising the host end to end.
//!
//! Speaks the one-shot contract: read one `tool/call` request frame from
//! stdin, write one response frame to stdout, exit. Implements a single
//! `calculate_sum` tool.

use std::io::{self, BufRead, Write};

use serde_json::{Value, json};
use wire::{CALL_METHOD, CallParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};

fn main() -> io::Result<()> {
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        // EOF before a request; nothing to answer.
        return Ok(());
    }

    let response = match serde_json::from_str::<JsonRpcRequest>(line.trim()) {
        Ok(request) => handle(request),
        Err(e) => error_response(None, -32700, format!("parse error: {e}")),
    };

    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &response)?;
    stdout.write_all(b"\n")?;
    stdout.flush()
}

fn handle(request: JsonRpcRequest) -> JsonRpcResponse {
    let id = Some(request.id.clone());

    if request.method != CALL_METHOD {
        return error_response(id, -32601, format!("unknown method '{}'", request.method));
    }

    let params = match request
        .params
        .and_then(|p| serde_json::from_value::<CallParams>(p).ok())
    {
        Some(params) => params,
        None => return error_response(id, -32602, "missing or malformed params".to_string()),
    };

    match params.name.as_str() {
        "calculate_sum" => calculate_sum(id, &params.arguments),
        other => error_response(id, -32602, format!("unknown tool '{other}'")),
    }
}

fn calculate_sum(id: Option<RequestId>, arguments: &Value) -> JsonRpcResponse {
    let (a, b) = match (arguments["a"].as_f64(), arguments["b"].as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return error_response(id, -32602, "expected numeric arguments 'a' and 'b'".to_string());
        }
    };

    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: Some(json!({ "sum": a + b })),
        error: None,
    }
}

fn error_response(id: Option<RequestId>, code: i32, message: String) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message,
            data: None,
        }),
    }
}
