//! ScriptManager: registry of open documents and their processors.
//!
//! Every open document has exactly one [`DocumentProcessor`] in the
//! `processors` map; removal on close is the state transition. Compiles run
//! as spawned tasks that report back over the event channel, and events are
//! applied in arrival order, so overlapping compiles of one document are
//! last-resolved-wins.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tsn_types::{CompilerResult, Position, Settings};

use crate::compiler::{CompileError, Compiler, CompilerOutput};
use crate::completion::filter_completions;
use crate::documents::TextDocument;
use crate::processor::{DocumentProcessor, ProcessorId};
use crate::types::{CompletionItem, ValidationResult};

/// Channel capacity for the event channel between compile tasks and the manager.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Operator-visible notices and diagnostics publication.
pub trait Messager {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
    /// Publish the diagnostics for one document, replacing any previous set.
    fn validation(&self, result: ValidationResult);
}

/// A finished compile, on its way back to the manager.
#[derive(Debug)]
pub struct CompileEvent {
    uri: String,
    processor: ProcessorId,
    outcome: Result<CompilerOutput, CompileError>,
}

impl CompileEvent {
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

pub struct ScriptManager<C, M> {
    compiler: Arc<C>,
    messager: M,
    settings: Settings,
    processors: HashMap<String, DocumentProcessor>,
    next_id: u64,
    in_flight: usize,
    event_tx: mpsc::Sender<CompileEvent>,
    event_rx: mpsc::Receiver<CompileEvent>,
}

impl<C: Compiler, M: Messager> ScriptManager<C, M> {
    /// Manager with default settings and no open documents.
    pub fn new(compiler: C, messager: M) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            compiler: Arc::new(compiler),
            messager,
            settings: Settings::default(),
            processors: HashMap::new(),
            next_id: 0,
            in_flight: 0,
            event_tx,
            event_rx,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn messager(&self) -> &M {
        &self.messager
    }

    #[must_use]
    pub fn has_document(&self, uri: &str) -> bool {
        self.processors.contains_key(uri)
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.processors.len()
    }

    /// Compiles started but not yet applied.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Cached compile for `uri`, if the document is open and has ever
    /// compiled successfully.
    #[must_use]
    pub fn last_result(&self, uri: &str) -> Option<&CompilerResult> {
        self.processors.get(uri)?.last_result()
    }

    /// Register a processor for a newly opened document and validate it.
    ///
    /// Reopening a URI that is already registered replaces its processor.
    pub fn on_document_open(&mut self, doc: &TextDocument) {
        self.next_id += 1;
        let processor = DocumentProcessor::new(ProcessorId(self.next_id), doc.clone());
        tracing::info!(uri = doc.uri(), "Document opened");
        self.processors.insert(doc.uri().to_string(), processor);
        self.schedule(doc.uri());
    }

    /// Drop the processor and its cached result. Compiles still in flight
    /// for it are discarded when they arrive.
    pub fn on_document_close(&mut self, uri: &str) {
        if self.processors.remove(uri).is_some() {
            tracing::info!(uri, "Document closed");
        }
    }

    /// Revalidate a saved document. Unknown documents are ignored.
    pub fn on_document_save(&mut self, doc: &TextDocument) {
        let Some(processor) = self.processors.get_mut(doc.uri()) else {
            tracing::debug!(uri = doc.uri(), "Save for unregistered document; ignoring");
            return;
        };
        processor.set_document(doc.clone());
        self.schedule(doc.uri());
    }

    /// Track the edited text. Edits never trigger a compile.
    pub fn on_document_change(&mut self, doc: &TextDocument) {
        if let Some(processor) = self.processors.get_mut(doc.uri()) {
            processor.set_document(doc.clone());
        }
    }

    /// Replace settings wholesale, then revalidate every open document.
    pub fn on_settings_changed(&mut self, settings: Settings) {
        tracing::info!(
            max_number_of_problems = settings.max_number_of_problems(),
            "Settings changed"
        );
        self.settings = settings;
        self.validate_all();
    }

    /// Start one validation per open document. Returns how many were started.
    pub fn validate_all(&mut self) -> usize {
        let mut uris: Vec<String> = self.processors.keys().cloned().collect();
        uris.sort();
        for uri in &uris {
            self.schedule(uri);
        }
        uris.len()
    }

    /// Completion candidates from the cached compile of `uri`.
    ///
    /// Empty when the document is not open or has never compiled.
    #[must_use]
    pub fn get_completions(&self, uri: &str, pos: Position) -> Vec<CompletionItem> {
        match self.last_result(uri) {
            Some(result) => filter_completions(result, pos),
            None => Vec::new(),
        }
    }

    /// Start a compile for `uri` in the background.
    ///
    /// A document without a filesystem path resolves at once with an empty
    /// diagnostics set.
    fn schedule(&mut self, uri: &str) {
        let Some(processor) = self.processors.get(uri) else {
            return;
        };
        let Some(path) = processor.compile_path() else {
            self.messager.validation(ValidationResult::empty(uri));
            return;
        };

        let event_tx = self.event_tx.clone();
        let compiler = Arc::clone(&self.compiler);
        let id = processor.id();
        let uri = uri.to_string();
        self.in_flight += 1;

        tokio::spawn(async move {
            let outcome = compiler.compile(&path).await;
            let event = CompileEvent {
                uri,
                processor: id,
                outcome,
            };
            if event_tx.send(event).await.is_err() {
                tracing::trace!("Manager dropped before compile finished");
            }
        });
    }

    /// Drain pending compile events, up to `budget`.
    ///
    /// Non-blocking: returns immediately if no events are available.
    pub fn poll_events(&mut self, budget: usize) -> usize {
        let mut count = 0;
        while count < budget {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    self.apply_event(event);
                    count += 1;
                }
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        count
    }

    /// Wait for the next compile event without applying it.
    ///
    /// Cancel-safe, so it can sit in a `select!` next to other inputs.
    /// Pends forever while nothing is in flight.
    pub async fn recv_event(&mut self) -> Option<CompileEvent> {
        self.event_rx.recv().await
    }

    /// Wait for one compile to finish and apply it. Returns `false` at once
    /// if nothing is in flight.
    pub async fn next_event(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.event_rx.recv().await {
            Some(event) => {
                self.apply_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply events until no compile is in flight.
    pub async fn settle(&mut self) {
        while self.next_event().await {}
    }

    /// Fold a finished compile into its processor and publish the result.
    pub fn apply_event(&mut self, event: CompileEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);

        let CompileEvent {
            uri,
            processor: id,
            outcome,
        } = event;
        let Some(processor) = self.processors.get_mut(&uri) else {
            tracing::debug!(uri = %uri, "Compile finished after close; discarding");
            return;
        };
        if processor.id() != id {
            tracing::debug!(uri = %uri, "Compile belongs to a previous open; discarding");
            return;
        }

        let result = processor.complete(outcome, &self.settings, &self.messager);
        self.messager.validation(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        EMPTY_RESULT, GatedCompiler, RecordingMessager, ScriptedCompiler, doc_location, stdout,
    };

    const SCOPED: &str = r#"{
        "logs": [
            { "type": "error", "message": "unknown symbol 'x'",
              "range": { "start": { "line": 1, "col": 4, "offset": 0 }, "end": { "line": 1, "col": 5, "offset": 0 } } },
            { "type": "info", "message": "^ declared here" },
            { "type": "warning", "message": "unused import" }
        ],
        "symbols": [{ "name": "x", "type": "value", "detail": "i32",
            "range": { "start": { "line": 0, "col": 0, "offset": 0 }, "end": { "line": 3, "col": 0, "offset": 0 } } }]
    }"#;

    fn open_doc(name: &str, text: &str) -> (TextDocument, std::path::PathBuf) {
        let (path, uri) = doc_location(name);
        (TextDocument::new(uri, 1, text), path)
    }

    #[tokio::test]
    async fn test_open_validates_and_publishes() {
        let (doc, path) = open_doc("main.tsn", "let a;\n");
        let compiler = ScriptedCompiler::new();
        compiler.push(&path, stdout(SCOPED));
        let mut manager = ScriptManager::new(compiler, RecordingMessager::new());

        manager.on_document_open(&doc);
        assert_eq!(manager.in_flight(), 1);
        manager.settle().await;

        assert_eq!(manager.in_flight(), 0);
        let validations = manager.messager().validations();
        assert_eq!(validations.len(), 1);
        assert_eq!(validations[0].uri(), doc.uri());
        assert_eq!(validations[0].diagnostics().len(), 2);
        assert_eq!(validations[0].error_count(), 1);
    }

    #[tokio::test]
    async fn test_settings_fan_out_once_per_open_document() {
        let (a, a_path) = open_doc("a.tsn", "");
        let (b, b_path) = open_doc("b.tsn", "");
        let (c, c_path) = open_doc("c.tsn", "");
        let mut manager = ScriptManager::new(ScriptedCompiler::new(), RecordingMessager::new());

        manager.on_document_open(&a);
        manager.on_document_open(&b);
        manager.on_document_open(&c);
        manager.settle().await;
        manager.on_document_close(c.uri());

        manager.on_settings_changed(Settings::new(5));
        assert_eq!(manager.in_flight(), 2);
        manager.settle().await;

        assert_eq!(manager.settings().max_number_of_problems(), 5);
        assert_eq!(manager.compiler.call_count(&a_path), 2);
        assert_eq!(manager.compiler.call_count(&b_path), 2);
        assert_eq!(manager.compiler.call_count(&c_path), 1);
        assert_eq!(manager.messager().validations().len(), 5);
    }

    #[tokio::test]
    async fn test_close_discards_in_flight_result() {
        let (doc, _) = open_doc("main.tsn", "");
        let compiler = GatedCompiler::default();
        let gate = compiler.gate();
        let mut manager = ScriptManager::new(compiler, RecordingMessager::new());

        manager.on_document_open(&doc);
        manager.on_document_close(doc.uri());
        gate.send(stdout(SCOPED)).unwrap();
        manager.settle().await;

        assert!(!manager.has_document(doc.uri()));
        assert!(manager.messager().validations().is_empty());
        assert!(manager.last_result(doc.uri()).is_none());
    }

    #[tokio::test]
    async fn test_reopen_ignores_previous_open_result() {
        let (doc, _) = open_doc("main.tsn", "");
        let compiler = GatedCompiler::default();
        let first = compiler.gate();
        let second = compiler.gate();
        let mut manager = ScriptManager::new(compiler, RecordingMessager::new());

        manager.on_document_open(&doc);
        manager.on_document_close(doc.uri());
        manager.on_document_open(&doc);

        second.send(stdout(EMPTY_RESULT)).unwrap();
        first.send(stdout(SCOPED)).unwrap();
        manager.settle().await;

        let validations = manager.messager().validations();
        assert_eq!(validations.len(), 1);
        assert!(validations[0].is_empty());
        assert!(manager.last_result(doc.uri()).unwrap().symbols.is_empty());
    }

    #[tokio::test]
    async fn test_last_resolved_wins() {
        let (doc, _) = open_doc("main.tsn", "");
        let compiler = GatedCompiler::default();
        let on_open = compiler.gate();
        let on_save = compiler.gate();
        let mut manager = ScriptManager::new(compiler, RecordingMessager::new());

        manager.on_document_open(&doc);
        manager.on_document_save(&doc);
        assert_eq!(manager.in_flight(), 2);

        // The later request resolves first...
        on_save.send(stdout(SCOPED)).unwrap();
        assert!(manager.next_event().await);
        assert_eq!(manager.get_completions(doc.uri(), Position::new(1, 0)).len(), 1);

        // ...and the earlier one overwrites it.
        on_open.send(stdout(EMPTY_RESULT)).unwrap();
        assert!(manager.next_event().await);
        assert!(manager.get_completions(doc.uri(), Position::new(1, 0)).is_empty());

        let validations = manager.messager().validations();
        assert_eq!(validations.len(), 2);
        assert_eq!(validations[0].diagnostics().len(), 2);
        assert!(validations[1].is_empty());
    }

    #[tokio::test]
    async fn test_save_without_processor_is_noop() {
        let (doc, _) = open_doc("main.tsn", "");
        let mut manager = ScriptManager::new(ScriptedCompiler::new(), RecordingMessager::new());

        manager.on_document_save(&doc);
        assert_eq!(manager.in_flight(), 0);
        assert!(!manager.next_event().await);
        assert!(manager.compiler.calls().is_empty());
        assert!(manager.messager().all().is_empty());
    }

    #[tokio::test]
    async fn test_unmappable_document_publishes_empty_without_compiling() {
        let doc = TextDocument::new("untitled:Untitled-1", 1, "let a;");
        let mut manager = ScriptManager::new(ScriptedCompiler::new(), RecordingMessager::new());

        manager.on_document_open(&doc);
        assert_eq!(manager.in_flight(), 0);
        assert!(manager.has_document("untitled:Untitled-1"));

        let validations = manager.messager().validations();
        assert_eq!(validations.len(), 1);
        assert!(validations[0].is_empty());
        assert!(manager.compiler.calls().is_empty());
    }

    #[tokio::test]
    async fn test_completions_empty_until_compiled() {
        let (doc, path) = open_doc("main.tsn", "");
        let compiler = ScriptedCompiler::new();
        compiler.push(&path, stdout(SCOPED));
        let mut manager = ScriptManager::new(compiler, RecordingMessager::new());
        let pos = Position::new(1, 0);

        assert!(manager.get_completions(doc.uri(), pos).is_empty());
        manager.on_document_open(&doc);
        assert!(manager.get_completions(doc.uri(), pos).is_empty());

        manager.settle().await;
        let items = manager.get_completions(doc.uri(), pos);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "x");
        assert!(manager.get_completions("file:///other.tsn", pos).is_empty());
    }

    #[tokio::test]
    async fn test_change_refreshes_text_without_compiling() {
        let (doc, path) = open_doc("main.tsn", "a");
        let compiler = ScriptedCompiler::new();
        compiler.push(&path, stdout(EMPTY_RESULT));
        compiler.push(&path, stdout(SCOPED));
        let mut manager = ScriptManager::new(compiler, RecordingMessager::new());
        manager.on_document_open(&doc);
        manager.settle().await;

        let edited = TextDocument::new(doc.uri(), 2, "a\nb\ncc");
        manager.on_document_change(&edited);
        assert_eq!(manager.in_flight(), 0);
        assert_eq!(manager.compiler.call_count(&path), 1);

        // The range-less warning now spans the edited text.
        manager.validate_all();
        manager.settle().await;
        let validations = manager.messager().validations();
        let warning = &validations[1].diagnostics()[1];
        assert_eq!(warning.range().end, Position::new(2, 2));
    }

    #[tokio::test]
    async fn test_launch_failure_publishes_empty_set() {
        let (doc, path) = open_doc("main.tsn", "");
        let compiler = ScriptedCompiler::new();
        compiler.push(&path, stdout(SCOPED));
        compiler.push(
            &path,
            Err(CompileError::Io(std::io::Error::other("no such file"))),
        );
        let mut manager = ScriptManager::new(compiler, RecordingMessager::new());

        manager.on_document_open(&doc);
        manager.on_document_save(&doc);
        manager.settle().await;

        let validations = manager.messager().validations();
        assert_eq!(validations.len(), 2);
        assert!(validations[1].is_empty());
        assert_eq!(manager.messager().errors().len(), 1);
        // The failed run does not disturb the cache.
        assert_eq!(manager.last_result(doc.uri()).unwrap().symbols.len(), 1);
    }

    #[tokio::test]
    async fn test_poll_events_respects_budget() {
        let mut manager = ScriptManager::new(ScriptedCompiler::new(), RecordingMessager::new());
        for name in ["a.tsn", "b.tsn", "c.tsn"] {
            manager.on_document_open(&open_doc(name, "").0);
        }

        let mut applied = 0;
        while manager.in_flight() > 0 {
            let count = manager.poll_events(1);
            assert!(count <= 1);
            applied += count;
            tokio::task::yield_now().await;
        }
        assert_eq!(applied, 3);
        assert_eq!(manager.poll_events(10), 0);
        assert_eq!(manager.messager().validations().len(), 3);
    }
}
