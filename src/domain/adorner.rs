//! Kind annotation of parsed expressions
//!
//! Every expression in a rendering is followed by `^#<label>#`. The label is
//! the surface macro name when the node came out of a macro expansion, and
//! the protobuf kind name of the node otherwise. Map and struct entries all
//! carry the same entry label.

use cel_syntax::ast::{ExprKind, Literal, SourceInfo};
use cel_syntax::debug::{Adornable, Adorner};
use cel_syntax::Ast;

use crate::ports::TreeRenderer;

pub const ENTRY_LABEL: &str = "*expr.Expr_CreateStruct_Entry";

pub struct KindAdorner<'a> {
    source_info: &'a SourceInfo,
}

impl<'a> KindAdorner<'a> {
    pub fn new(source_info: &'a SourceInfo) -> Self {
        Self { source_info }
    }
}

impl Adorner for KindAdorner<'_> {
    fn metadata(&self, elem: Adornable<'_>) -> String {
        match elem {
            Adornable::Expr(expr) => {
                if let Some(call) = self.source_info.macro_call(expr.id) {
                    return format!("^#{}#", call.function);
                }
                format!("^#{}#", kind_label(&expr.kind))
            }
            Adornable::Entry(_) => format!("^#{ENTRY_LABEL}#"),
        }
    }
}

/// Structural label of an expression kind; empty for placeholder nodes.
pub fn kind_label(kind: &ExprKind) -> String {
    let label = match kind {
        ExprKind::Call(_) => "*expr.Expr_CallExpr",
        ExprKind::Comprehension(_) => "*expr.Expr_ComprehensionExpr",
        ExprKind::Ident(_) => "*expr.Expr_IdentExpr",
        ExprKind::Literal(lit) => return literal_label(lit),
        ExprKind::List(_) => "*expr.Expr_ListExpr",
        ExprKind::Map(_) | ExprKind::Struct(_) => "*expr.Expr_StructExpr",
        ExprKind::Select(_) => "*expr.Expr_SelectExpr",
        _ => "",
    };
    label.to_string()
}

fn literal_label(lit: &Literal) -> String {
    let label = match lit {
        Literal::Bool(_) => "*expr.Constant_BoolValue",
        Literal::Bytes(_) => "*expr.Constant_BytesValue",
        Literal::Double(_) => "*expr.Constant_DoubleValue",
        Literal::Int(_) => "*expr.Constant_Int64Value",
        Literal::Null => "*expr.Constant_NullValue",
        Literal::String(_) => "*expr.Constant_StringValue",
        Literal::Uint(_) => "*expr.Constant_Uint64Value",
        other => other.type_name(),
    };
    label.to_string()
}

/// Render `ast` with a kind label after every node.
pub fn annotate(ast: &Ast, renderer: &dyn TreeRenderer) -> String {
    renderer.render(&ast.expr, &KindAdorner::new(&ast.source_info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_syntax::ast::{CallExpr, EntryExpr, EntryKind, Expr, MacroCall};

    fn int(id: i64, value: i64) -> Expr {
        Expr {
            id,
            kind: ExprKind::Literal(Literal::Int(value)),
        }
    }

    #[test]
    fn test_literal_subtypes_have_distinct_labels() {
        let info = SourceInfo::default();
        let adorner = KindAdorner::new(&info);
        let cases = [
            (Literal::Bool(true), "^#*expr.Constant_BoolValue#"),
            (Literal::Bytes(vec![1]), "^#*expr.Constant_BytesValue#"),
            (Literal::Double(1.5), "^#*expr.Constant_DoubleValue#"),
            (Literal::Int(1), "^#*expr.Constant_Int64Value#"),
            (Literal::Null, "^#*expr.Constant_NullValue#"),
            (Literal::String("s".into()), "^#*expr.Constant_StringValue#"),
            (Literal::Uint(1), "^#*expr.Constant_Uint64Value#"),
        ];
        for (lit, want) in cases {
            let expr = Expr {
                id: 1,
                kind: ExprKind::Literal(lit),
            };
            assert_eq!(adorner.metadata(Adornable::Expr(&expr)), want);
        }
    }

    #[test]
    fn test_macro_call_takes_precedence_over_kind() {
        let call = Expr {
            id: 3,
            kind: ExprKind::Call(CallExpr {
                function: "_+_".into(),
                target: None,
                args: vec![int(1, 1), int(2, 2)],
            }),
        };
        let mut info = SourceInfo::default();
        info.macro_calls.insert(
            3,
            MacroCall {
                function: "has".into(),
                target: None,
                args: vec![],
            },
        );
        let adorner = KindAdorner::new(&info);
        assert_eq!(adorner.metadata(Adornable::Expr(&call)), "^#has#");
        assert_eq!(
            adorner.metadata(Adornable::Expr(&int(1, 1))),
            "^#*expr.Constant_Int64Value#"
        );
    }

    #[test]
    fn test_entries_share_one_label() {
        let info = SourceInfo::default();
        let entry = EntryExpr {
            id: 4,
            kind: EntryKind::StructField {
                name: "f".into(),
                value: int(5, 1),
                optional: false,
            },
        };
        assert_eq!(
            KindAdorner::new(&info).metadata(Adornable::Entry(&entry)),
            "^#*expr.Expr_CreateStruct_Entry#"
        );
    }

    #[test]
    fn test_annotate_passes_macro_info_to_renderer() {
        struct LabelOnly;
        impl TreeRenderer for LabelOnly {
            fn render(&self, expr: &Expr, adorner: &dyn Adorner) -> String {
                adorner.metadata(Adornable::Expr(expr))
            }
        }
        let mut source_info = SourceInfo::default();
        source_info.macro_calls.insert(
            1,
            MacroCall {
                function: "all".into(),
                target: None,
                args: vec![],
            },
        );
        let ast = Ast {
            expr: int(1, 0),
            source_info,
        };
        assert_eq!(annotate(&ast, &LabelOnly), "^#all#");
    }
}
