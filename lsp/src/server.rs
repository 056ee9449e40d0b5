//! Stdio protocol shell: JSON-RPC over `Content-Length` framing, driving a
//! [`ScriptManager`].
//!
//! Three tasks cooperate. A reader task turns the input stream into frames,
//! a writer task serializes everything bound for the client, and the loop in
//! [`run`] owns all state and interleaves client frames with finished
//! compiles.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::codec::{MessageReader, MessageWriter};
use crate::compiler::Compiler;
use crate::completion::{builtin_type_completions, keyword_completions};
use crate::documents::DocumentStore;
use crate::manager::{CompileEvent, Messager, ScriptManager};
use crate::protocol::{
    self, DidChangeConfigurationParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DidSaveTextDocumentParams, Incoming, MessageType, Notification,
    PublishDiagnosticsParams, Request, Response, ShowMessageParams, TextDocumentPositionParams,
};
use crate::types::{CompletionItem, ValidationResult};

const INBOUND_CHANNEL_CAPACITY: usize = 64;

enum WriterCommand {
    Send(serde_json::Value),
    Shutdown,
}

/// Why [`run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The client sent `exit`. `clean` is whether `shutdown` came first.
    Exit { clean: bool },
    /// The input stream ended or could no longer be framed.
    InputClosed,
}

impl StopReason {
    /// Process exit code the protocol asks for.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Exit { clean: true } => 0,
            Self::Exit { clean: false } | Self::InputClosed => 1,
        }
    }
}

fn enqueue<T: Serialize>(writer_tx: &mpsc::UnboundedSender<WriterCommand>, msg: &T) {
    let frame = match serde_json::to_value(msg) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Dropping unserializable outbound message: {e}");
            return;
        }
    };
    if writer_tx.send(WriterCommand::Send(frame)).is_err() {
        tracing::debug!("Writer closed; dropping outbound message");
    }
}

/// [`Messager`] that turns notices into `window/showMessage` and results
/// into `textDocument/publishDiagnostics`.
#[derive(Clone)]
pub(crate) struct ClientMessager {
    writer_tx: mpsc::UnboundedSender<WriterCommand>,
}

impl ClientMessager {
    fn notify<P: Serialize>(&self, method: &'static str, params: &P) {
        match serde_json::to_value(params) {
            Ok(params) => enqueue(&self.writer_tx, &Notification::new(method, Some(params))),
            Err(e) => tracing::warn!(method, "Dropping unserializable params: {e}"),
        }
    }

    fn show(&self, kind: MessageType, message: &str) {
        self.notify("window/showMessage", &ShowMessageParams { kind, message });
    }
}

impl Messager for ClientMessager {
    fn info(&self, msg: &str) {
        self.show(MessageType::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.show(MessageType::Warning, msg);
    }

    fn error(&self, msg: &str) {
        self.show(MessageType::Error, msg);
    }

    fn validation(&self, result: ValidationResult) {
        tracing::debug!(
            uri = result.uri(),
            count = result.diagnostics().len(),
            "Publishing diagnostics"
        );
        self.notify(
            "textDocument/publishDiagnostics",
            &PublishDiagnosticsParams::from(&result),
        );
    }
}

enum Flow {
    Continue,
    Exit,
}

enum Step {
    Inbound(Option<serde_json::Value>),
    Compiled(CompileEvent),
}

fn parse_params<T: DeserializeOwned>(method: &str, params: serde_json::Value) -> Option<T> {
    match serde_json::from_value(params) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(method, error = %e, "Ignoring notification with invalid params");
            None
        }
    }
}

struct Server<C: Compiler> {
    manager: ScriptManager<C, ClientMessager>,
    documents: DocumentStore,
    writer_tx: mpsc::UnboundedSender<WriterCommand>,
    next_request_id: u64,
    shutdown_requested: bool,
}

impl<C: Compiler> Server<C> {
    fn handle_frame(&mut self, frame: &serde_json::Value) -> Flow {
        let Some(incoming) = protocol::parse_incoming(frame) else {
            tracing::trace!("Ignoring malformed JSON-RPC frame");
            return Flow::Continue;
        };

        match incoming {
            Incoming::Request { id, method, params } => {
                let response = self.handle_request(id, &method, params);
                enqueue(&self.writer_tx, &response);
                Flow::Continue
            }
            Incoming::Notification { method, params } => self.handle_notification(&method, params),
            Incoming::Response { id } => {
                tracing::debug!(%id, "Client answered our request");
                Flow::Continue
            }
        }
    }

    fn handle_request(
        &mut self,
        id: serde_json::Value,
        method: &str,
        params: serde_json::Value,
    ) -> Response {
        if self.shutdown_requested {
            return Response::error(id, protocol::INVALID_REQUEST, "Server is shutting down");
        }

        match method {
            "initialize" => {
                tracing::info!("Client initializing");
                Response::ok(id, protocol::initialize_result())
            }
            "shutdown" => {
                tracing::info!("Shutdown requested");
                self.shutdown_requested = true;
                Response::ok(id, serde_json::Value::Null)
            }
            "textDocument/completion" => {
                match serde_json::from_value::<TextDocumentPositionParams>(params) {
                    Ok(params) => match serde_json::to_value(self.completions(&params)) {
                        Ok(items) => Response::ok(id, items),
                        Err(e) => Response::error(id, protocol::INTERNAL_ERROR, e.to_string()),
                    },
                    Err(e) => Response::error(
                        id,
                        protocol::INVALID_PARAMS,
                        format!("invalid completion params: {e}"),
                    ),
                }
            }
            "completionItem/resolve" | "documentLink/resolve" => Response::ok(id, params),
            "textDocument/documentLink" => Response::ok(id, serde_json::json!([])),
            _ => {
                tracing::debug!(method, "Unsupported request");
                Response::error(
                    id,
                    protocol::METHOD_NOT_FOUND,
                    format!("Method not found: {method}"),
                )
            }
        }
    }

    /// Scoped completions for the cursor, then keywords, then builtin types.
    fn completions(&self, params: &TextDocumentPositionParams) -> Vec<CompletionItem> {
        self.manager
            .get_completions(&params.text_document.uri, params.position)
            .into_iter()
            .chain(keyword_completions())
            .chain(builtin_type_completions())
            .collect()
    }

    fn handle_notification(&mut self, method: &str, params: serde_json::Value) -> Flow {
        match method {
            "initialized" => self.register_configuration(),
            "exit" => return Flow::Exit,
            "textDocument/didOpen" => {
                if let Some(p) = parse_params::<DidOpenTextDocumentParams>(method, params) {
                    let item = p.text_document;
                    tracing::debug!(uri = %item.uri, language = %item.language_id, "didOpen");
                    let doc = self.documents.open(&item.uri, item.version, item.text);
                    self.manager.on_document_open(doc);
                }
            }
            "textDocument/didChange" => {
                if let Some(mut p) = parse_params::<DidChangeTextDocumentParams>(method, params) {
                    // Full sync: the last change carries the whole text.
                    let Some(change) = p.content_changes.pop() else {
                        return Flow::Continue;
                    };
                    let id = p.text_document;
                    if let Some(doc) = self.documents.change(&id.uri, id.version, change.text) {
                        self.manager.on_document_change(doc);
                    }
                }
            }
            "textDocument/didSave" => {
                if let Some(p) = parse_params::<DidSaveTextDocumentParams>(method, params) {
                    let uri = p.text_document.uri;
                    if let Some(text) = p.text
                        && let Some(version) = self.documents.get(&uri).map(|d| d.version())
                    {
                        self.documents.change(&uri, version, text);
                    }
                    if let Some(doc) = self.documents.get(&uri) {
                        self.manager.on_document_save(doc);
                    }
                }
            }
            "textDocument/didClose" => {
                if let Some(p) = parse_params::<DidCloseTextDocumentParams>(method, params) {
                    let uri = p.text_document.uri;
                    self.documents.close(&uri);
                    self.manager.on_document_close(&uri);
                }
            }
            "workspace/didChangeConfiguration" => {
                if let Some(p) = parse_params::<DidChangeConfigurationParams>(method, params) {
                    match protocol::settings_from_configuration(p) {
                        Ok(settings) => self.manager.on_settings_changed(settings),
                        Err(e) => {
                            tracing::warn!(error = %e, "Rejected configuration change");
                            self.manager.messager().error(&format!(
                                "Ignoring invalid {} settings: {e}",
                                protocol::SETTINGS_SECTION
                            ));
                        }
                    }
                }
            }
            _ => tracing::trace!(method, "Ignoring notification"),
        }
        Flow::Continue
    }

    fn register_configuration(&mut self) {
        let id = self.next_request_id;
        self.next_request_id += 1;
        let request = Request::new(
            id,
            "client/registerCapability",
            Some(protocol::register_configuration_params()),
        );
        enqueue(&self.writer_tx, &request);
    }
}

/// Serve one client until it exits or its input ends.
///
/// # Errors
///
/// Only if the writer task panics. Protocol-level problems are answered on
/// the wire or logged, never returned.
pub async fn run<R, W, C>(input: R, output: W, compiler: C) -> Result<StopReason>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    C: Compiler,
{
    let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<WriterCommand>();
    let writer_handle = tokio::spawn(async move {
        let mut writer = MessageWriter::new(output);
        while let Some(cmd) = writer_rx.recv().await {
            match cmd {
                WriterCommand::Send(frame) => {
                    if let Err(e) = writer.write_message(&frame).await {
                        tracing::warn!("Client write error: {e:#}");
                        break;
                    }
                }
                WriterCommand::Shutdown => break,
            }
        }
    });

    let (inbound_tx, mut inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
    let reader_handle = tokio::spawn(async move {
        let mut reader = MessageReader::new(input);
        loop {
            match reader.read_message().await {
                Ok(Some(frame)) => {
                    if inbound_tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::info!("Client closed input");
                    break;
                }
                Err(e) => {
                    tracing::warn!("Client read error: {e:#}");
                    break;
                }
            }
        }
    });

    let messager = ClientMessager {
        writer_tx: writer_tx.clone(),
    };
    let mut server = Server {
        manager: ScriptManager::new(compiler, messager),
        documents: DocumentStore::new(),
        writer_tx: writer_tx.clone(),
        next_request_id: 1,
        shutdown_requested: false,
    };

    let reason = loop {
        let step = tokio::select! {
            frame = inbound_rx.recv() => Step::Inbound(frame),
            Some(event) = server.manager.recv_event() => Step::Compiled(event),
        };
        match step {
            Step::Inbound(Some(frame)) => {
                if let Flow::Exit = server.handle_frame(&frame) {
                    break StopReason::Exit {
                        clean: server.shutdown_requested,
                    };
                }
            }
            Step::Inbound(None) => break StopReason::InputClosed,
            Step::Compiled(event) => server.manager.apply_event(event),
        }
    };

    tracing::info!(?reason, "Server loop finished");
    reader_handle.abort();
    drop(server);
    // Frames queued before this are still written.
    let _ = writer_tx.send(WriterCommand::Shutdown);
    writer_handle.await.context("writer task failed")?;
    Ok(reason)
}
