//! Scoped completion from a cached compile, plus the static language tables.

use tsn_types::{CompilerResult, Position, SymbolKind, SymbolRange};

use crate::types::{CompletionItem, CompletionItemKind};

/// Name fragments of members that cannot be invoked by name.
const NON_INVOKABLE_FRAGMENTS: [&str; 3] = ["operator", "constructor", "destructor"];

/// Prefixes of compiler-synthesized names.
const INTERNAL_PREFIXES: [char; 2] = ['@', '$'];

fn symbol_kind_to_completion(kind: SymbolKind) -> CompletionItemKind {
    match kind {
        SymbolKind::Function => CompletionItemKind::Function,
        SymbolKind::Module => CompletionItemKind::Module,
        SymbolKind::Type => CompletionItemKind::Class,
        SymbolKind::Value => CompletionItemKind::Variable,
    }
}

fn is_completable_symbol(symbol: &SymbolRange, pos: Position) -> bool {
    if symbol.name.starts_with(INTERNAL_PREFIXES) {
        return false;
    }
    if NON_INVOKABLE_FRAGMENTS
        .iter()
        .any(|frag| symbol.name.contains(frag))
    {
        return false;
    }
    symbol.range.to_range().strictly_contains(pos)
}

/// Completion candidates visible at `pos` in a compiled document.
///
/// In scope symbols come first, then named types, then globals. No
/// de-duplication and no relevance sorting.
#[must_use]
pub fn filter_completions(result: &CompilerResult, pos: Position) -> Vec<CompletionItem> {
    let symbols = result
        .symbols
        .iter()
        .filter(|s| is_completable_symbol(s, pos))
        .map(|s| {
            CompletionItem::new(
                s.name.clone(),
                symbol_kind_to_completion(s.kind),
                Some(s.detail.clone()),
            )
        });

    let types = result
        .types
        .iter()
        .filter(|t| !t.is_anonymous() && !t.is_function())
        .map(|t| {
            CompletionItem::new(
                t.name.clone(),
                CompletionItemKind::Class,
                Some(t.fully_qualified_name.clone()),
            )
        });

    let globals = result.globals.iter().map(|g| {
        CompletionItem::new(
            g.name.clone(),
            CompletionItemKind::Value,
            Some(g.type_name.clone()),
        )
    });

    symbols.chain(types).chain(globals).collect()
}

struct StaticCompletion {
    label: &'static str,
    kind: CompletionItemKind,
    detail: Option<&'static str>,
}

const fn keyword(label: &'static str) -> StaticCompletion {
    StaticCompletion {
        label,
        kind: CompletionItemKind::Keyword,
        detail: None,
    }
}

const fn constant(label: &'static str) -> StaticCompletion {
    StaticCompletion {
        label,
        kind: CompletionItemKind::Constant,
        detail: None,
    }
}

const fn builtin(label: &'static str, detail: &'static str) -> StaticCompletion {
    StaticCompletion {
        label,
        kind: CompletionItemKind::Class,
        detail: Some(detail),
    }
}

static KEYWORDS: [StaticCompletion; 34] = [
    keyword("if"),
    keyword("else"),
    keyword("do"),
    keyword("while"),
    keyword("for"),
    keyword("break"),
    keyword("continue"),
    keyword("type"),
    keyword("enum"),
    keyword("class"),
    keyword("extends"),
    keyword("public"),
    keyword("private"),
    keyword("import"),
    keyword("export"),
    keyword("from"),
    keyword("as"),
    keyword("operator"),
    keyword("static"),
    keyword("const"),
    keyword("get"),
    keyword("set"),
    constant("null"),
    keyword("return"),
    keyword("switch"),
    keyword("case"),
    keyword("default"),
    constant("true"),
    constant("false"),
    keyword("this"),
    keyword("function"),
    keyword("let"),
    keyword("new"),
    StaticCompletion {
        label: "sizeof",
        kind: CompletionItemKind::Keyword,
        detail: Some("sizeof<T>"),
    },
];

static BUILTIN_TYPES: [StaticCompletion; 14] = [
    builtin("string", "A string of text"),
    builtin("i8", "8 bit signed integer"),
    builtin("i16", "16 bit signed integer"),
    builtin("i32", "32 bit signed integer"),
    builtin("i64", "64 bit signed integer"),
    builtin("u8", "8 bit unsigned integer"),
    builtin("u16", "16 bit unsigned integer"),
    builtin("u32", "32 bit unsigned integer"),
    builtin("u64", "64 bit unsigned integer"),
    builtin("f32", "32 bit floating point number"),
    builtin("f64", "64 bit floating point number"),
    builtin("void", "Represents nothing"),
    builtin("data", "Pointer to memory address"),
    builtin("boolean", "True or false"),
];

fn materialize(table: &[StaticCompletion]) -> impl Iterator<Item = CompletionItem> + '_ {
    table
        .iter()
        .map(|s| CompletionItem::new(s.label, s.kind, s.detail.map(String::from)))
}

/// Language keywords, in declaration order.
pub fn keyword_completions() -> impl Iterator<Item = CompletionItem> {
    materialize(&KEYWORDS)
}

/// Builtin primitive types, in declaration order.
pub fn builtin_type_completions() -> impl Iterator<Item = CompletionItem> {
    materialize(&BUILTIN_TYPES)
}
