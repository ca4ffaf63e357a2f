//! Expression tree produced by the parser.
//!
//! Every node carries a parse-unique id. Ids index into [`SourceInfo`], which
//! records where each node came from and, when macro-call population is
//! enabled, which macro invocation an expanded node stands for.

use std::collections::HashMap;

pub type ExprId = i64;

/// A parsed expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

/// Node kinds.
///
/// New kinds may be added; consumers must keep a fallback arm.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExprKind {
    /// Placeholder left behind by a reported error.
    Unspecified,
    Call(CallExpr),
    Comprehension(Box<ComprehensionExpr>),
    Ident(String),
    List(ListExpr),
    Literal(Literal),
    Map(MapExpr),
    Select(SelectExpr),
    Struct(StructExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub function: String,
    pub target: Option<Box<Expr>>,
    pub args: Vec<Expr>,
}

impl CallExpr {
    pub fn is_member_function(&self) -> bool {
        self.target.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComprehensionExpr {
    pub iter_range: Expr,
    pub iter_var: String,
    pub iter_var2: Option<String>,
    pub accu_var: String,
    pub accu_init: Expr,
    pub loop_condition: Expr,
    pub loop_step: Expr,
    pub result: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListExpr {
    pub elements: Vec<Expr>,
    /// Positions in `elements` written as `?elem`.
    pub optional_indices: Vec<usize>,
}

impl ListExpr {
    pub fn is_optional(&self, index: usize) -> bool {
        self.optional_indices.contains(&index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapExpr {
    pub entries: Vec<EntryExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructExpr {
    pub type_name: String,
    pub fields: Vec<EntryExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpr {
    pub operand: Box<Expr>,
    pub field: String,
    pub test_only: bool,
}

/// A map entry or a message field initializer. Entries have their own ids.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryExpr {
    pub id: ExprId,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    MapEntry { key: Expr, value: Expr, optional: bool },
    StructField { name: String, value: Expr, optional: bool },
}

/// Constant values.
///
/// New primitive kinds may be added; consumers must keep a fallback arm.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Literal {
    Bool(bool),
    Bytes(Vec<u8>),
    Double(f64),
    Int(i64),
    Null,
    String(String),
    Uint(u64),
}

impl Literal {
    /// Runtime type name of the value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Bool(_) => "bool",
            Literal::Bytes(_) => "bytes",
            Literal::Double(_) => "double",
            Literal::Int(_) => "int",
            Literal::Null => "null_type",
            Literal::String(_) => "string",
            Literal::Uint(_) => "uint",
        }
    }
}

/// Surface form of a macro invocation that was expanded away.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroCall {
    pub function: String,
    pub target: Option<Expr>,
    pub args: Vec<Expr>,
}

/// Positional and provenance metadata for a parsed expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceInfo {
    /// Code point offset of the token each node was created from.
    pub positions: HashMap<ExprId, usize>,
    /// Code point offsets at which each line after the first begins.
    pub line_offsets: Vec<usize>,
    pub macro_calls: HashMap<ExprId, MacroCall>,
}

impl SourceInfo {
    pub fn macro_call(&self, id: ExprId) -> Option<&MacroCall> {
        self.macro_calls.get(&id)
    }

    pub fn position(&self, id: ExprId) -> Option<usize> {
        self.positions.get(&id).copied()
    }
}

/// A successfully parsed expression and its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub expr: Expr,
    pub source_info: SourceInfo,
}
