//! Node construction with id allocation and position bookkeeping.

use std::collections::HashMap;

use crate::ast::{
    CallExpr, ComprehensionExpr, EntryExpr, EntryKind, Expr, ExprId, ExprKind, ListExpr, Literal,
    MacroCall, MapExpr, SelectExpr, SourceInfo, StructExpr,
};

#[derive(Debug, Default)]
pub(crate) struct ExprFactory {
    next_id: ExprId,
    positions: HashMap<ExprId, usize>,
    macro_calls: HashMap<ExprId, MacroCall>,
}

impl ExprFactory {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Allocate an id for a node that starts at `offset`.
    pub fn id(&mut self, offset: usize) -> ExprId {
        let id = self.next_id;
        self.next_id += 1;
        self.positions.insert(id, offset);
        id
    }

    pub fn position(&self, id: ExprId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn delete_id(&mut self, id: ExprId) {
        self.positions.remove(&id);
    }

    pub fn add_macro_call(&mut self, id: ExprId, call: MacroCall) {
        self.macro_calls.insert(id, call);
    }

    pub fn unspecified(&mut self, offset: usize) -> Expr {
        Expr {
            id: self.id(offset),
            kind: ExprKind::Unspecified,
        }
    }

    pub fn literal(&mut self, offset: usize, value: Literal) -> Expr {
        Expr {
            id: self.id(offset),
            kind: ExprKind::Literal(value),
        }
    }

    pub fn ident(&mut self, offset: usize, name: impl Into<String>) -> Expr {
        Expr {
            id: self.id(offset),
            kind: ExprKind::Ident(name.into()),
        }
    }

    pub fn select(&mut self, offset: usize, operand: Expr, field: String, test_only: bool) -> Expr {
        Expr {
            id: self.id(offset),
            kind: ExprKind::Select(SelectExpr {
                operand: Box::new(operand),
                field,
                test_only,
            }),
        }
    }

    /// Build a call node around an id allocated by the caller.
    pub fn call_with_id(id: ExprId, function: &str, target: Option<Expr>, args: Vec<Expr>) -> Expr {
        Expr {
            id,
            kind: ExprKind::Call(CallExpr {
                function: function.to_string(),
                target: target.map(Box::new),
                args,
            }),
        }
    }

    pub fn call(&mut self, offset: usize, function: &str, args: Vec<Expr>) -> Expr {
        let id = self.id(offset);
        Self::call_with_id(id, function, None, args)
    }

    pub fn list(&mut self, offset: usize, elements: Vec<Expr>, optional_indices: Vec<usize>) -> Expr {
        Expr {
            id: self.id(offset),
            kind: ExprKind::List(ListExpr {
                elements,
                optional_indices,
            }),
        }
    }

    pub fn map(&mut self, offset: usize, entries: Vec<EntryExpr>) -> Expr {
        Expr {
            id: self.id(offset),
            kind: ExprKind::Map(MapExpr { entries }),
        }
    }

    pub fn message(&mut self, offset: usize, type_name: String, fields: Vec<EntryExpr>) -> Expr {
        Expr {
            id: self.id(offset),
            kind: ExprKind::Struct(StructExpr { type_name, fields }),
        }
    }

    pub fn entry(&mut self, offset: usize, kind: EntryKind) -> EntryExpr {
        EntryExpr {
            id: self.id(offset),
            kind,
        }
    }

    pub fn comprehension(&mut self, offset: usize, comprehension: ComprehensionExpr) -> Expr {
        Expr {
            id: self.id(offset),
            kind: ExprKind::Comprehension(Box::new(comprehension)),
        }
    }

    pub fn into_source_info(self, line_offsets: Vec<usize>) -> SourceInfo {
        SourceInfo {
            positions: self.positions,
            line_offsets,
            macro_calls: self.macro_calls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_from_one() {
        let mut factory = ExprFactory::new();
        let a = factory.ident(0, "a");
        let b = factory.literal(4, Literal::Int(1));
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(factory.position(2), Some(4));
    }

    #[test]
    fn test_deleted_ids_lose_their_position() {
        let mut factory = ExprFactory::new();
        let id = factory.id(3);
        factory.delete_id(id);
        assert_eq!(factory.position(id), None);
    }
}
