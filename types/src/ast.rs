//! Syntax tree fragments attached to compiler output.
//!
//! The language server never interprets the tree. Trees are kept as raw
//! JSON ([`RawAst`]) while the surrounding compiler document is parsed,
//! so nesting depth can never cost a document its logs and symbols. The
//! typed [`AstNode`] view is built on demand.

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::compiler::CodeRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Empty,
    Root,
    Eos,
    Break,
    Cast,
    Catch,
    Class,
    Continue,
    Export,
    Expression,
    FunctionType,
    Function,
    Identifier,
    If,
    ImportModule,
    ImportSymbol,
    Import,
    Literal,
    Loop,
    ObjectDecompositor,
    ObjectLiteralProperty,
    Parameter,
    Property,
    Return,
    ScopedBlock,
    Sizeof,
    SwitchCase,
    Switch,
    This,
    Throw,
    Try,
    TypeModifier,
    TypeProperty,
    TypeSpecifier,
    Type,
    Variable,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Undefined,
    Add,
    AddEq,
    Sub,
    SubEq,
    Mul,
    MulEq,
    Div,
    DivEq,
    Mod,
    ModEq,
    Xor,
    XorEq,
    BitAnd,
    BitAndEq,
    BitOr,
    BitOrEq,
    BitInv,
    ShLeft,
    ShLeftEq,
    ShRight,
    ShRightEq,
    Not,
    NotEq,
    LogAnd,
    LogAndEq,
    LogOr,
    LogOrEq,
    Assign,
    Compare,
    LessThan,
    LessThanEq,
    GreaterThan,
    GreaterThanEq,
    PreInc,
    PostInc,
    PreDec,
    PostDec,
    Negate,
    Index,
    Conditional,
    Member,
    New,
    PlacementNew,
    Call,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    TemplateString,
    Object,
    Array,
    Null,
    True,
    False,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeFlag {
    IsConst,
    IsStatic,
    IsPrivate,
    IsArray,
    IsPointer,
    DeferCond,
    #[serde(other)]
    Unknown,
}

/// Where a node came from in the source text.
#[derive(Debug, Clone, Deserialize)]
pub struct AstSource {
    pub range: CodeRange,
    #[serde(default)]
    pub line_text: String,
    #[serde(default)]
    pub indx_text: String,
}

/// A child slot holds either a single node or a list of nodes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AstChild {
    One(Box<AstNode>),
    Many(Vec<AstNode>),
}

impl AstChild {
    /// The slot's nodes, regardless of which form the compiler used.
    #[must_use]
    pub fn nodes(&self) -> &[AstNode] {
        match self {
            Self::One(node) => std::slice::from_ref(node.as_ref()),
            Self::Many(nodes) => nodes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AstNode {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub source: Option<AstSource>,
    #[serde(default)]
    pub value_type: Option<LiteralType>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub operation: Option<Operation>,
    #[serde(default)]
    pub flags: Vec<NodeFlag>,
    #[serde(default)]
    pub data_type: Option<AstChild>,
    #[serde(default)]
    pub lvalue: Option<AstChild>,
    #[serde(default)]
    pub rvalue: Option<AstChild>,
    #[serde(default)]
    pub cond: Option<AstChild>,
    #[serde(default)]
    pub body: Option<AstChild>,
    #[serde(default)]
    pub else_body: Option<AstChild>,
    #[serde(default)]
    pub initializer: Option<AstChild>,
    #[serde(default)]
    pub parameters: Option<AstChild>,
    #[serde(default)]
    pub template_parameters: Option<AstChild>,
    #[serde(default)]
    pub modifier: Option<AstChild>,
    #[serde(default)]
    pub alias: Option<AstChild>,
    #[serde(default)]
    pub extends: Option<AstChild>,
}

/// A tree exactly as the compiler printed it.
///
/// Skipping over raw JSON is iterative in serde_json, so this accepts any
/// depth. [`RawAst::node`] and [`RawAst::child`] parse the typed form and
/// are subject to serde_json's usual recursion limit.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RawAst(Box<RawValue>);

impl RawAst {
    /// The tree's JSON text.
    #[must_use]
    pub fn json(&self) -> &str {
        self.0.get()
    }

    pub fn node(&self) -> Result<AstNode, serde_json::Error> {
        serde_json::from_str(self.0.get())
    }

    pub fn child(&self) -> Result<AstChild, serde_json::Error> {
        serde_json::from_str(self.0.get())
    }
}
