//! Compiler result model.
//!
//! The shape of the single JSON document the compiler prints on stdout for
//! one source file. These types carry no behavior beyond coordinate
//! conversion; the language server owns interpretation.

use serde::Deserialize;

use crate::ast::RawAst;
use crate::position::{Position, Range};

/// One endpoint of a [`CodeRange`]. All fields are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct SourcePoint {
    pub line: u32,
    pub col: u32,
    #[serde(default)]
    pub offset: u32,
}

impl SourcePoint {
    /// Editor position for this point. Lines and columns are zero-based in
    /// both domains, so this is a field rename.
    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(self.line, self.col)
    }
}

/// A span in a compiled document, as reported by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct CodeRange {
    pub start: SourcePoint,
    pub end: SourcePoint,
}

impl CodeRange {
    #[must_use]
    pub fn to_range(&self) -> Range {
        Range::new(self.start.position(), self.end.position())
    }
}

impl From<CodeRange> for Range {
    fn from(range: CodeRange) -> Self {
        range.to_range()
    }
}

/// Severity class of a compiler log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Warning,
    Error,
}

/// One diagnostic-producing event from the compiler.
///
/// Logs arrive as an ordered sequence. An `info` record whose message starts
/// with `^` continues the record before it rather than standing alone.
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerLog {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: LogKind,
    #[serde(default)]
    pub range: Option<CodeRange>,
    #[serde(default)]
    pub line_txt: Option<String>,
    #[serde(default)]
    pub line_idx: Option<String>,
    pub message: String,
    #[serde(default)]
    pub ast: Option<RawAst>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessModifier {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BriefFunctionInfo {
    pub name: String,
    pub fully_qualified_name: String,
    #[serde(default)]
    pub access: AccessModifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFlag {
    IsPod,
    IsTriviallyConstructible,
    IsTriviallyCopyable,
    IsTriviallyDestructible,
    IsPrimitive,
    IsFloatingPoint,
    IsIntegral,
    IsUnsigned,
    IsFunction,
    IsTemplate,
    IsAlias,
    IsHost,
    IsAnonymous,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeBase {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub access: AccessModifier,
    #[serde(default)]
    pub data_offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypePropertyFlag {
    IsStatic,
    IsPointer,
    CanRead,
    CanWrite,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub access: AccessModifier,
    #[serde(default)]
    pub getter: Option<String>,
    #[serde(default)]
    pub setter: Option<String>,
    #[serde(default)]
    pub flags: Vec<TypePropertyFlag>,
}

/// A named type known to the compiler. Global scope; not range-scoped.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeInfo {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub host_hash: u64,
    pub name: String,
    pub fully_qualified_name: String,
    #[serde(default)]
    pub access: AccessModifier,
    #[serde(default)]
    pub flags: Vec<TypeFlag>,
    #[serde(default)]
    pub destructor: Option<BriefFunctionInfo>,
    #[serde(default)]
    pub alias_of: Option<String>,
    #[serde(default)]
    pub inherits: Vec<TypeBase>,
    #[serde(default)]
    pub properties: Vec<TypeProperty>,
    #[serde(default)]
    pub methods: Vec<BriefFunctionInfo>,
}

impl TypeInfo {
    #[must_use]
    pub fn has_flag(&self, flag: TypeFlag) -> bool {
        self.flags.contains(&flag)
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.has_flag(TypeFlag::IsAnonymous)
    }

    #[must_use]
    pub fn is_function(&self) -> bool {
        self.has_flag(TypeFlag::IsFunction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionArgType {
    FuncPtr,
    RetPtr,
    EctxPtr,
    ThisPtr,
    Value,
    Pointer,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionArg {
    pub arg_type: FunctionArgType,
    #[serde(default)]
    pub is_implicit: bool,
    pub data_type: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionInfo {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub fully_qualified_name: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub access: AccessModifier,
    #[serde(default)]
    pub is_method: bool,
    #[serde(default)]
    pub is_thiscall: bool,
    #[serde(default)]
    pub args: Vec<FunctionArg>,
    /// Disassembled body, one instruction per entry.
    #[serde(default)]
    pub code: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalInfo {
    pub name: String,
    #[serde(default)]
    pub access: AccessModifier,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Value,
    Function,
    Module,
    Type,
}

/// A declared name together with the span over which it is visible.
///
/// `range` is the symbol's scope (e.g. the enclosing function body), not
/// its declaration site.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolRange {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SymbolKind,
    #[serde(default)]
    pub detail: String,
    pub range: CodeRange,
}

/// Everything one compile produced.
///
/// Replaced wholesale on each successful compile; never merged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompilerResult {
    #[serde(default)]
    pub logs: Vec<CompilerLog>,
    #[serde(default)]
    pub symbols: Vec<SymbolRange>,
    #[serde(default)]
    pub types: Vec<TypeInfo>,
    #[serde(default)]
    pub functions: Vec<FunctionInfo>,
    #[serde(default)]
    pub globals: Vec<GlobalInfo>,
    #[serde(default)]
    pub ast: Option<RawAst>,
}
