//! JSON-RPC and LSP wire shapes used by the server loop.

use serde::{Deserialize, Serialize, Serializer};
use tsn_types::{Position, Settings};

use crate::types::{Diagnostic, ValidationResult};

pub(crate) const INVALID_REQUEST: i64 = -32600;
pub(crate) const METHOD_NOT_FOUND: i64 = -32601;
pub(crate) const INVALID_PARAMS: i64 = -32602;
pub(crate) const INTERNAL_ERROR: i64 = -32603;

/// Key under `workspace/didChangeConfiguration` settings that holds ours.
pub(crate) const SETTINGS_SECTION: &str = "tsppServer";

/// Server-to-client request.
#[derive(Debug, Serialize)]
pub(crate) struct Request {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    pub fn new(id: u64, method: &'static str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    pub fn new(method: &'static str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Outcome {
    Result(serde_json::Value),
    Error(ResponseError),
}

/// Reply to a client request. Exactly one of `result`/`error` is present.
#[derive(Debug, Serialize)]
pub(crate) struct Response {
    pub jsonrpc: &'static str,
    pub id: serde_json::Value,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    pub fn ok(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: Outcome::Result(result),
        }
    }

    pub fn error(id: serde_json::Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: Outcome::Error(ResponseError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// A frame received from the client, classified.
#[derive(Debug, PartialEq)]
pub(crate) enum Incoming {
    Request {
        id: serde_json::Value,
        method: String,
        params: serde_json::Value,
    },
    Notification {
        method: String,
        params: serde_json::Value,
    },
    /// Reply to one of our own requests.
    Response { id: serde_json::Value },
}

/// Classify a frame; `None` for anything that is not JSON-RPC shaped.
pub(crate) fn parse_incoming(frame: &serde_json::Value) -> Option<Incoming> {
    let id = frame.get("id").filter(|id| !id.is_null()).cloned();
    let method = frame
        .get("method")
        .and_then(serde_json::Value::as_str)
        .map(String::from);
    let params = frame
        .get("params")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    let is_reply = frame.get("result").is_some() || frame.get("error").is_some();

    match (id, method) {
        (Some(id), Some(method)) => Some(Incoming::Request { id, method, params }),
        (None, Some(method)) => Some(Incoming::Notification { method, params }),
        (Some(id), None) if is_reply => Some(Incoming::Response { id }),
        _ => None,
    }
}

/// `window/showMessage` severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageType {
    Error = 1,
    Warning = 2,
    Info = 3,
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ShowMessageParams<'a> {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PublishDiagnosticsParams<'a> {
    pub uri: &'a str,
    pub diagnostics: &'a [Diagnostic],
}

impl<'a> From<&'a ValidationResult> for PublishDiagnosticsParams<'a> {
    fn from(result: &'a ValidationResult) -> Self {
        Self {
            uri: result.uri(),
            diagnostics: result.diagnostics(),
        }
    }
}

/// Capabilities advertised in the `initialize` reply.
pub(crate) fn initialize_result() -> serde_json::Value {
    serde_json::json!({
        "capabilities": {
            "textDocumentSync": 1,
            "completionProvider": { "resolveProvider": true },
            "documentLinkProvider": { "resolveProvider": true }
        },
        "serverInfo": {
            "name": "tsn-langsrv",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// `client/registerCapability` params asking for configuration change
/// notifications.
pub(crate) fn register_configuration_params() -> serde_json::Value {
    serde_json::json!({
        "registrations": [{
            "id": "tsn-did-change-configuration",
            "method": "workspace/didChangeConfiguration"
        }]
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextDocumentIdentifier {
    pub uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TextDocumentItem {
    pub uri: String,
    #[serde(default)]
    pub language_id: String,
    pub version: i32,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionedTextDocumentIdentifier {
    pub uri: String,
    pub version: i32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextDocumentContentChangeEvent {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DidOpenTextDocumentParams {
    pub text_document: TextDocumentItem,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DidChangeTextDocumentParams {
    pub text_document: VersionedTextDocumentIdentifier,
    pub content_changes: Vec<TextDocumentContentChangeEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DidSaveTextDocumentParams {
    pub text_document: TextDocumentIdentifier,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DidCloseTextDocumentParams {
    pub text_document: TextDocumentIdentifier,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DidChangeConfigurationParams {
    #[serde(default)]
    pub settings: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TextDocumentPositionParams {
    pub text_document: TextDocumentIdentifier,
    pub position: Position,
}

/// Our settings out of a configuration-changed payload. A missing
/// section means defaults.
pub(crate) fn settings_from_configuration(
    params: DidChangeConfigurationParams,
) -> Result<Settings, serde_json::Error> {
    match params.settings.get(SETTINGS_SECTION) {
        None | Some(serde_json::Value::Null) => Ok(Settings::default()),
        Some(section) => serde_json::from_value(section.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiagnosticSeverity, RelatedInformation};
    use serde_json::json;
    use tsn_types::Range;

    #[test]
    fn test_parse_incoming_kinds() {
        let request = json!({ "jsonrpc": "2.0", "id": 1, "method": "shutdown" });
        assert_eq!(
            parse_incoming(&request),
            Some(Incoming::Request {
                id: json!(1),
                method: "shutdown".into(),
                params: serde_json::Value::Null,
            })
        );

        let note = json!({ "jsonrpc": "2.0", "method": "exit" });
        assert!(matches!(
            parse_incoming(&note),
            Some(Incoming::Notification { method, .. }) if method == "exit"
        ));

        let reply = json!({ "jsonrpc": "2.0", "id": 4, "result": null });
        assert_eq!(parse_incoming(&reply), Some(Incoming::Response { id: json!(4) }));

        assert!(parse_incoming(&json!({ "jsonrpc": "2.0" })).is_none());
        assert!(parse_incoming(&json!({ "jsonrpc": "2.0", "id": 2 })).is_none());
    }

    #[test]
    fn test_string_ids_are_preserved() {
        let frame = json!({ "jsonrpc": "2.0", "id": "abc", "method": "initialize", "params": {} });
        let Some(Incoming::Request { id, .. }) = parse_incoming(&frame) else {
            panic!("expected request");
        };
        let response = serde_json::to_value(Response::ok(id, json!(null))).unwrap();
        assert_eq!(response, json!({ "jsonrpc": "2.0", "id": "abc", "result": null }));
    }

    #[test]
    fn test_error_response_has_no_result() {
        let response =
            serde_json::to_value(Response::error(json!(9), METHOD_NOT_FOUND, "Method not found: x"))
                .unwrap();
        assert_eq!(response["error"]["code"], -32601);
        assert!(response.get("result").is_none());
    }

    #[test]
    fn test_initialize_capabilities() {
        let caps = &initialize_result()["capabilities"];
        assert_eq!(caps["textDocumentSync"], 1);
        assert_eq!(caps["completionProvider"]["resolveProvider"], true);
        assert_eq!(caps["documentLinkProvider"]["resolveProvider"], true);
    }

    #[test]
    fn test_show_message_type_is_numeric() {
        let params = ShowMessageParams {
            kind: MessageType::Warning,
            message: "careful",
        };
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            json!({ "type": 2, "message": "careful" })
        );
    }

    #[test]
    fn test_publish_diagnostics_shape() {
        let range = Range::new(Position::new(1, 4), Position::new(1, 5));
        let result = ValidationResult::new(
            "file:///a.tsn",
            vec![Diagnostic::new(
                DiagnosticSeverity::Error,
                range,
                "E1".into(),
                "unknown symbol 'x'".into(),
                vec![RelatedInformation::new("file:///a.tsn", range, "declared here")],
            )],
        );
        let value = serde_json::to_value(PublishDiagnosticsParams::from(&result)).unwrap();
        assert_eq!(value["uri"], "file:///a.tsn");
        let diag = &value["diagnostics"][0];
        assert_eq!(diag["severity"], 1);
        assert_eq!(diag["source"], "tsn-compiler");
        assert_eq!(diag["range"]["start"], json!({ "line": 1, "character": 4 }));
        assert_eq!(
            diag["relatedInformation"][0]["location"]["uri"],
            "file:///a.tsn"
        );
        assert_eq!(diag["relatedInformation"][0]["message"], "declared here");
    }

    #[test]
    fn test_inbound_params() {
        let open: DidOpenTextDocumentParams = serde_json::from_value(json!({
            "textDocument": { "uri": "file:///a.tsn", "languageId": "tsn", "version": 1, "text": "let a;" }
        }))
        .unwrap();
        assert_eq!(open.text_document.text, "let a;");

        let change: DidChangeTextDocumentParams = serde_json::from_value(json!({
            "textDocument": { "uri": "file:///a.tsn", "version": 2 },
            "contentChanges": [{ "text": "let b;" }]
        }))
        .unwrap();
        assert_eq!(change.content_changes[0].text, "let b;");

        let completion: TextDocumentPositionParams = serde_json::from_value(json!({
            "textDocument": { "uri": "file:///a.tsn" },
            "position": { "line": 3, "character": 7 }
        }))
        .unwrap();
        assert_eq!(completion.position, Position::new(3, 7));
    }

    #[test]
    fn test_settings_from_configuration() {
        let parse = |settings: serde_json::Value| {
            settings_from_configuration(DidChangeConfigurationParams { settings })
        };

        let custom = parse(json!({ "tsppServer": { "maxNumberOfProblems": 7 } })).unwrap();
        assert_eq!(custom.max_number_of_problems(), 7);

        let missing = parse(json!({ "other": {} })).unwrap();
        assert_eq!(missing.max_number_of_problems(), 100);

        assert!(parse(json!({ "tsppServer": { "maxNumberOfProblems": "lots" } })).is_err());
        assert!(parse(json!({ "tsppServer": { "maxNumberOfProblems": -1 } })).is_err());
    }
}
