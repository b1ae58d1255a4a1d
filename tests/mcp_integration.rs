//! Integration tests for MCP protocol handling.
//!
//! These tests drive the envelope codec and dispatcher with the full OTT tool
//! set, checking request/response shapes and error codes end to end.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok, block_on};

use ooottt_mcp::config::SubscriptionConfig;
use ooottt_mcp::mcp::protocol::{decode, DecodeError, RequestId};
use ooottt_mcp::mcp::Dispatcher;
use ooottt_mcp::ott::{SubscriptionCatalog, TrendSource, TrendingTitle, UpstreamError};
use ooottt_mcp::tools;

struct OfflineTrends;

#[async_trait]
impl TrendSource for OfflineTrends {
    async fn weekly_trending(&self, _limit: usize) -> Result<Vec<TrendingTitle>, UpstreamError> {
        Err(UpstreamError::MissingCredential)
    }
}

fn dispatcher() -> Dispatcher {
    let catalog = SubscriptionCatalog::from_config(&SubscriptionConfig::default());
    Dispatcher::new(Arc::new(tools::registry(catalog, Arc::new(OfflineTrends))))
}

/// Sends raw bytes through decode + dispatch and returns the reply as JSON.
fn roundtrip(dispatcher: &Dispatcher, raw: &str) -> Value {
    let reply = block_on(dispatcher.handle_raw(raw.as_bytes()));
    serde_json::from_str(&reply.to_json()).unwrap()
}

fn call(dispatcher: &Dispatcher, id: Value, name: &str, arguments: Value) -> Value {
    let request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    });
    roundtrip(dispatcher, &request.to_string())
}

// =============================================================================
// Codec Tests
// =============================================================================

#[test]
fn test_decode_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let envelope = assert_ok!(decode(json.as_bytes()));
    assert_eq!(envelope.method, "initialize");
    assert_eq!(envelope.id, RequestId::Number(1));
    assert_eq!(envelope.params["clientInfo"]["name"], "test-client");
}

#[test]
fn test_decode_fills_defaults() {
    let envelope = assert_ok!(decode(br#"{"method":"tools/list"}"#));
    assert_eq!(envelope.id, RequestId::Number(1));
    assert_eq!(envelope.params, json!({}));
}

#[test]
fn test_decode_invalid_json() {
    let err = assert_err!(decode(b"not valid json"));
    assert!(matches!(err, DecodeError::Parse(_)));
}

#[test]
fn test_decode_wrong_version_keeps_id() {
    let err = assert_err!(decode(br#"{"jsonrpc":"1.0","id":"abc","method":"ping"}"#));
    assert!(matches!(err, DecodeError::Malformed { .. }));
    assert_eq!(err.id(), RequestId::String("abc".to_string()));
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_initialize_echoes_id() {
    let reply = roundtrip(&dispatcher(), r#"{"method":"initialize","id":7}"#);
    assert_eq!(reply["id"], 7);
    assert_eq!(reply["jsonrpc"], "2.0");
    assert_eq!(reply["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(reply["result"]["capabilities"], json!({"tools": {}}));
    assert_eq!(reply["result"]["serverInfo"]["name"], "ooottt");
    assert!(reply.get("error").is_none());
}

#[test]
fn test_tools_list_advertises_all_tools() {
    let reply = roundtrip(&dispatcher(), r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#);
    let tools = reply["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 9);
    assert_eq!(tools[0]["name"], "calculate_usage");
    assert_eq!(tools[8]["name"], "ott_trend_report");
    for tool in tools {
        assert!(tool["inputSchema"].is_object());
        assert!(tool["description"].is_string());
    }
}

#[test]
fn test_list_is_stable_across_calls() {
    let dispatcher = dispatcher();
    let first = roundtrip(&dispatcher, r#"{"id":1,"method":"tools/list"}"#);
    let second = roundtrip(&dispatcher, r#"{"id":1,"method":"tools/list"}"#);
    assert_eq!(first, second);
}

#[test]
fn test_calculate_usage_netflix_ten_hours() {
    let reply = call(
        &dispatcher(),
        json!(3),
        "calculate_usage",
        json!({"platform": "netflix", "watched_hours": 10}),
    );
    let content = reply["result"]["content"].as_array().unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0]["type"], "text");
    assert!(content[0]["text"].as_str().unwrap().contains("33.3%"));
}

#[test]
fn test_every_tool_call_echoes_id() {
    let dispatcher = dispatcher();
    let calls = [
        ("calculate_usage", json!({"platform": "watcha", "watched_hours": 3})),
        ("calculate_remaining", json!({"platform": "watcha", "current_percentage": 40})),
        ("recommend_short_content", json!({})),
        ("search_by_description", json!({"description": "tears"})),
        ("analyze_viewing_pattern", json!({})),
        ("share_account_optimizer", json!({})),
        ("expiring_content_alert", json!({})),
        ("subscription_manager", json!({"subscriptions": ["netflix"]})),
        ("ott_trend_report", json!({})),
    ];

    for (index, (name, arguments)) in calls.into_iter().enumerate() {
        for id in [json!(index), json!(format!("req-{index}")), Value::Null] {
            let reply = call(&dispatcher, id.clone(), name, arguments.clone());
            assert_eq!(reply["id"], id, "{name}");
            assert!(reply.get("error").is_none(), "{name}: {reply}");
            assert!(!reply["result"]["content"].as_array().unwrap().is_empty());
        }
    }
}

#[test]
fn test_missing_arguments_object_means_empty() {
    let reply = roundtrip(
        &dispatcher(),
        r#"{"id":4,"method":"tools/call","params":{"name":"recommend_short_content"}}"#,
    );
    assert!(reply["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("30 minutes"));
}

#[test]
fn test_missing_required_argument_is_invalid_params() {
    let reply = call(&dispatcher(), json!(5), "calculate_usage", json!({"platform": "netflix"}));
    assert_eq!(reply["id"], 5);
    assert_eq!(reply["error"]["code"], -32602);
    assert!(reply["error"]["message"]
        .as_str()
        .unwrap()
        .contains("watched_hours"));
    assert!(reply.get("result").is_none());
}

#[test]
fn test_wrong_argument_type_is_invalid_params() {
    let reply = call(
        &dispatcher(),
        json!(6),
        "calculate_usage",
        json!({"platform": "netflix", "watched_hours": "ten"}),
    );
    assert_eq!(reply["error"]["code"], -32602);
}

#[test]
fn test_unknown_tool() {
    let reply = call(&dispatcher(), json!(8), "does_not_exist", json!({}));
    assert_eq!(reply["id"], 8);
    assert_eq!(reply["error"]["code"], -32601);
    assert_eq!(reply["error"]["message"], "Unknown tool: does_not_exist");
}

#[test]
fn test_unknown_method() {
    let reply = roundtrip(&dispatcher(), r#"{"jsonrpc":"2.0","id":9,"method":"resources/list"}"#);
    assert_eq!(reply["error"]["code"], -32601);
    assert_eq!(reply["error"]["message"], "Method not found: resources/list");
}

#[test]
fn test_parse_error_uses_sentinel_id() {
    let reply = roundtrip(&dispatcher(), "{\"id\": 3,");
    assert_eq!(reply["id"], 1);
    assert_eq!(reply["error"]["code"], -32700);
}

#[test]
fn test_non_object_is_invalid_request() {
    let reply = roundtrip(&dispatcher(), "[1, 2, 3]");
    assert_eq!(reply["error"]["code"], -32600);
}

#[test]
fn test_trend_report_without_credentials_still_answers() {
    let reply = call(&dispatcher(), json!("trend"), "ott_trend_report", json!({"platform": "wavve"}));
    let text = reply["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("📈 WAVVE"));
    assert!(text.contains("unavailable"));
}
