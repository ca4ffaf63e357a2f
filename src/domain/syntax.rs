// Go source model for cel-fixtures.
// Only the node kinds the fixture shapes descend through are kept; the rest
// collapse into `Other` so that a mismatch is a skip, never a crash.

/// One parsed Go file: its top-level declarations in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFile {
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// `var` or `const` declaration.
    Gen(GenDecl),
    Func(FuncDecl),
    /// Imports, type declarations.
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKeyword {
    Var,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenDecl {
    pub keyword: DeclKeyword,
    pub specs: Vec<ValueSpec>,
}

/// `a, b = x, y` inside a `var`/`const` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<String>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    /// `None` for declarations without a body.
    pub body: Option<Vec<Stmt>>,
}

impl FuncDecl {
    pub fn first_statement(&self) -> Option<&Stmt> {
        self.body.as_ref().and_then(|stmts| stmts.first())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `=`, `:=` and the compound assignment operators.
    Assign(AssignStmt),
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignStmt {
    pub lhs: Vec<Expr>,
    pub rhs: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    CompositeLit(CompositeLit),
    KeyValue(Box<KeyValue>),
    Ident(String),
    BasicLit(BasicLit),
    Other(String),
}

impl Expr {
    pub fn as_composite(&self) -> Option<&CompositeLit> {
        match self {
            Expr::CompositeLit(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn as_key_value(&self) -> Option<&KeyValue> {
        match self {
            Expr::KeyValue(kv) => Some(kv),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// The literal when it is a quoted string or rune; numbers are not text.
    pub fn as_text_literal(&self) -> Option<&BasicLit> {
        match self {
            Expr::BasicLit(lit) if lit.kind.is_text() => Some(lit),
            _ => None,
        }
    }
}

/// `T{...}`, or `{...}` with the type elided inside an enclosing literal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeLit {
    pub type_text: Option<String>,
    pub elts: Vec<Expr>,
}

impl CompositeLit {
    /// Values of the elements keyed by the identifier `key`, in element order.
    pub fn values_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Expr> + 'a {
        self.elts
            .iter()
            .filter_map(Expr::as_key_value)
            .filter(move |kv| kv.key.as_ident() == Some(key))
            .map(|kv| &kv.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    String,
    RawString,
    Char,
    Int,
    Float,
    Imag,
}

impl LitKind {
    pub fn is_text(self) -> bool {
        matches!(self, LitKind::String | LitKind::RawString | LitKind::Char)
    }
}

/// A literal token with its source text, quotes included.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicLit {
    pub kind: LitKind,
    pub raw: String,
}

impl BasicLit {
    pub fn new(kind: LitKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }
}
