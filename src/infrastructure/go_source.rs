//! Go source lowering
//!
//! Parses Go with tree-sitter and lowers the concrete tree into
//! [`crate::domain::syntax`]. Node kinds the fixture shapes never descend into
//! are kept only by name.

use thiserror::Error;
use tree_sitter::{Language, Node, Parser};

use crate::domain::syntax::{
    AssignStmt, BasicLit, CompositeLit, Decl, DeclKeyword, Expr, FuncDecl, GenDecl, KeyValue,
    LitKind, SourceFile, Stmt, ValueSpec,
};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot load Go grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),
    #[error("{path}: no syntax tree produced")]
    NoTree { path: String },
    #[error("{path}:{line}:{column}: syntax error")]
    Unparsable {
        path: String,
        line: usize,
        column: usize,
    },
}

/// Parse `text` (named `path` in errors) into a [`SourceFile`].
pub fn parse_go_source(path: &str, text: &str) -> Result<SourceFile, SourceError> {
    let language: Language = tree_sitter_go::LANGUAGE.into();
    let mut parser = Parser::new();
    parser.set_language(&language)?;
    let tree = parser.parse(text, None).ok_or_else(|| SourceError::NoTree {
        path: path.to_string(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        let at = first_error(root).unwrap_or(root).start_position();
        return Err(SourceError::Unparsable {
            path: path.to_string(),
            line: at.row + 1,
            column: at.column + 1,
        });
    }

    let lowering = Lowering {
        src: text.as_bytes(),
    };
    let decls = named_children(root)
        .into_iter()
        .filter_map(|node| lowering.decl(node))
        .collect();
    Ok(SourceFile { decls })
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

/// Named children without comments.
fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect();
    children
}

struct Lowering<'src> {
    src: &'src [u8],
}

impl Lowering<'_> {
    fn text(&self, node: Node<'_>) -> String {
        node.utf8_text(self.src).unwrap_or_default().to_string()
    }

    fn decl(&self, node: Node<'_>) -> Option<Decl> {
        let decl = match node.kind() {
            "package_clause" => return None,
            "var_declaration" => Decl::Gen(GenDecl {
                keyword: DeclKeyword::Var,
                specs: self.value_specs(node, "var_spec"),
            }),
            "const_declaration" => Decl::Gen(GenDecl {
                keyword: DeclKeyword::Const,
                specs: self.value_specs(node, "const_spec"),
            }),
            "function_declaration" | "method_declaration" => Decl::Func(self.func(node)),
            other => Decl::Other(other.to_string()),
        };
        Some(decl)
    }

    fn value_specs(&self, node: Node<'_>, spec_kind: &str) -> Vec<ValueSpec> {
        let mut specs = Vec::new();
        for child in named_children(node) {
            if child.kind() == spec_kind {
                specs.push(self.value_spec(child));
            } else if child.kind().ends_with("_spec_list") {
                specs.extend(
                    named_children(child)
                        .into_iter()
                        .filter(|spec| spec.kind() == spec_kind)
                        .map(|spec| self.value_spec(spec)),
                );
            }
        }
        specs
    }

    fn value_spec(&self, node: Node<'_>) -> ValueSpec {
        let mut cursor = node.walk();
        let names = node
            .children_by_field_name("name", &mut cursor)
            .filter(|name| name.kind() == "identifier")
            .map(|name| self.text(name))
            .collect();
        let values = node
            .child_by_field_name("value")
            .map(|list| self.expression_list(list))
            .unwrap_or_default();
        ValueSpec { names, values }
    }

    fn func(&self, node: Node<'_>) -> FuncDecl {
        FuncDecl {
            name: node
                .child_by_field_name("name")
                .map(|name| self.text(name))
                .unwrap_or_default(),
            body: node.child_by_field_name("body").map(|block| self.block(block)),
        }
    }

    fn block(&self, node: Node<'_>) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        for child in named_children(node) {
            if child.kind() == "statement_list" {
                stmts.extend(named_children(child).into_iter().map(|s| self.stmt(s)));
            } else {
                stmts.push(self.stmt(child));
            }
        }
        stmts
    }

    fn stmt(&self, node: Node<'_>) -> Stmt {
        match node.kind() {
            "short_var_declaration" | "assignment_statement" => {
                let side = |field: &str| {
                    node.child_by_field_name(field)
                        .map(|list| self.expression_list(list))
                        .unwrap_or_default()
                };
                Stmt::Assign(AssignStmt {
                    lhs: side("left"),
                    rhs: side("right"),
                })
            }
            other => Stmt::Other(other.to_string()),
        }
    }

    fn expression_list(&self, node: Node<'_>) -> Vec<Expr> {
        if node.kind() != "expression_list" {
            return vec![self.expr(node)];
        }
        named_children(node)
            .into_iter()
            .map(|child| self.expr(child))
            .collect()
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        let literal = |kind| Expr::BasicLit(BasicLit::new(kind, self.text(node)));
        match node.kind() {
            "composite_literal" => Expr::CompositeLit(CompositeLit {
                type_text: node.child_by_field_name("type").map(|ty| self.text(ty)),
                elts: node
                    .child_by_field_name("body")
                    .map(|body| self.elements(body))
                    .unwrap_or_default(),
            }),
            "literal_value" => Expr::CompositeLit(CompositeLit {
                type_text: None,
                elts: self.elements(node),
            }),
            "literal_element" => match named_children(node).first() {
                Some(inner) => self.expr(*inner),
                None => Expr::Other("literal_element".to_string()),
            },
            "keyed_element" => match named_children(node).as_slice() {
                [key, value] => Expr::KeyValue(Box::new(KeyValue {
                    key: self.expr(*key),
                    value: self.expr(*value),
                })),
                _ => Expr::Other("keyed_element".to_string()),
            },
            "identifier" | "field_identifier" => Expr::Ident(self.text(node)),
            "interpreted_string_literal" => literal(LitKind::String),
            "raw_string_literal" => literal(LitKind::RawString),
            "rune_literal" => literal(LitKind::Char),
            "int_literal" => literal(LitKind::Int),
            "float_literal" => literal(LitKind::Float),
            "imaginary_literal" => literal(LitKind::Imag),
            other => Expr::Other(other.to_string()),
        }
    }

    fn elements(&self, literal_value: Node<'_>) -> Vec<Expr> {
        named_children(literal_value)
            .into_iter()
            .map(|child| self.expr(child))
            .collect()
    }
}
