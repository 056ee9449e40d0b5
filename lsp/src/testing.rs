//! In-memory compiler and messager doubles for unit tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::compiler::{CompileError, Compiler, CompilerOutput};
use crate::manager::Messager;
use crate::types::ValidationResult;

/// Stdout of a compile that produced nothing at all.
pub(crate) const EMPTY_RESULT: &str = r#"{"logs":[],"symbols":[],"types":[],"functions":[],"globals":[],"ast":null}"#;

#[cfg(windows)]
fn test_root() -> PathBuf {
    PathBuf::from(r"C:\project")
}

#[cfg(not(windows))]
fn test_root() -> PathBuf {
    PathBuf::from("/project")
}

/// Filesystem path and matching `file:` URI for a test document.
pub(crate) fn doc_location(name: &str) -> (PathBuf, String) {
    let path = test_root().join(name);
    let uri = crate::documents::path_to_file_uri(&path)
        .expect("absolute test path")
        .to_string();
    (path, uri)
}

pub(crate) fn stdout(json: &str) -> Result<CompilerOutput, CompileError> {
    Ok(CompilerOutput {
        stdout: json.to_string(),
        stderr: String::new(),
    })
}

/// Answers each path with queued outcomes, falling back to [`EMPTY_RESULT`].
#[derive(Default)]
pub(crate) struct ScriptedCompiler {
    queued: Mutex<HashMap<PathBuf, VecDeque<Result<CompilerOutput, CompileError>>>>,
    calls: Mutex<Vec<PathBuf>>,
}

impl ScriptedCompiler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, path: &Path, outcome: Result<CompilerOutput, CompileError>) {
        self.queued
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default()
            .push_back(outcome);
    }

    pub(crate) fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self, path: &Path) -> usize {
        self.calls.lock().unwrap().iter().filter(|p| *p == path).count()
    }
}

impl Compiler for ScriptedCompiler {
    fn compile(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<CompilerOutput, CompileError>> + Send {
        self.calls.lock().unwrap().push(path.to_path_buf());
        let outcome = self
            .queued
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| stdout(EMPTY_RESULT));
        std::future::ready(outcome)
    }
}

type Gate = oneshot::Receiver<Result<CompilerOutput, CompileError>>;

/// Each call waits until the test releases it, so resolution order is
/// under the test's control.
#[derive(Default)]
pub(crate) struct GatedCompiler {
    gates: Mutex<VecDeque<Gate>>,
}

impl GatedCompiler {
    /// Queue a gate for the next call; send on the returned sender to resolve it.
    pub(crate) fn gate(&self) -> oneshot::Sender<Result<CompilerOutput, CompileError>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }
}

impl Compiler for GatedCompiler {
    fn compile(
        &self,
        _path: &Path,
    ) -> impl Future<Output = Result<CompilerOutput, CompileError>> + Send {
        let gate = self.gates.lock().unwrap().pop_front();
        async move {
            match gate {
                Some(rx) => rx.await.unwrap_or_else(|_| stdout(EMPTY_RESULT)),
                None => stdout(EMPTY_RESULT),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Recorded {
    Info(String),
    Warn(String),
    Error(String),
    Validation(ValidationResult),
}

#[derive(Default)]
pub(crate) struct RecordingMessager {
    log: Mutex<Vec<Recorded>>,
}

impl RecordingMessager {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn all(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn validations(&self) -> Vec<ValidationResult> {
        self.all()
            .into_iter()
            .filter_map(|m| match m {
                Recorded::Validation(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn errors(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter_map(|m| match m {
                Recorded::Error(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn infos(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter_map(|m| match m {
                Recorded::Info(i) => Some(i),
                _ => None,
            })
            .collect()
    }
}

impl Messager for RecordingMessager {
    fn info(&self, msg: &str) {
        self.log.lock().unwrap().push(Recorded::Info(msg.to_string()));
    }

    fn warn(&self, msg: &str) {
        self.log.lock().unwrap().push(Recorded::Warn(msg.to_string()));
    }

    fn error(&self, msg: &str) {
        self.log.lock().unwrap().push(Recorded::Error(msg.to_string()));
    }

    fn validation(&self, result: ValidationResult) {
        self.log.lock().unwrap().push(Recorded::Validation(result));
    }
}
