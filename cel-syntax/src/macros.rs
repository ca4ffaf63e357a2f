//! The standard macro set.
//!
//! A macro rewrites a call, global or receiver-style, into another expression
//! at parse time. Macros are looked up by function name, argument count and
//! call style; an expander may decline by returning `Ok(None)`.

use std::fmt;

use crate::ast::{ComprehensionExpr, Expr, ExprId, ExprKind, Literal};
use crate::helper::ExprFactory;

/// Name of the accumulator variable introduced by comprehension macros.
pub const ACCUMULATOR_NAME: &str = "__result__";

pub type MacroExpander =
    fn(&mut MacroExprHelper<'_>, Option<Expr>, Vec<Expr>) -> Result<Option<Expr>, MacroError>;

/// Expansion failure, reported at the node named by `expr_id` when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroError {
    pub expr_id: Option<ExprId>,
    pub message: String,
}

#[derive(Clone)]
pub struct Macro {
    function: &'static str,
    /// `None` accepts any number of arguments.
    arg_count: Option<usize>,
    receiver_style: bool,
    expander: MacroExpander,
}

impl fmt::Debug for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl Macro {
    pub fn global(function: &'static str, arg_count: usize, expander: MacroExpander) -> Self {
        Self {
            function,
            arg_count: Some(arg_count),
            receiver_style: false,
            expander,
        }
    }

    pub fn receiver(function: &'static str, arg_count: usize, expander: MacroExpander) -> Self {
        Self {
            function,
            arg_count: Some(arg_count),
            receiver_style: true,
            expander,
        }
    }

    pub fn global_var_arg(function: &'static str, expander: MacroExpander) -> Self {
        Self {
            function,
            arg_count: None,
            receiver_style: false,
            expander,
        }
    }

    pub fn receiver_var_arg(function: &'static str, expander: MacroExpander) -> Self {
        Self {
            function,
            arg_count: None,
            receiver_style: true,
            expander,
        }
    }

    pub fn function(&self) -> &str {
        self.function
    }

    pub fn key(&self) -> String {
        match self.arg_count {
            Some(n) => macro_key(self.function, n, self.receiver_style),
            None => var_arg_macro_key(self.function, self.receiver_style),
        }
    }

    pub(crate) fn expander(&self) -> MacroExpander {
        self.expander
    }
}

pub(crate) fn macro_key(function: &str, arg_count: usize, receiver_style: bool) -> String {
    format!("{}:{}:{}", function, arg_count, receiver_style)
}

pub(crate) fn var_arg_macro_key(function: &str, receiver_style: bool) -> String {
    format!("{}:*:{}", function, receiver_style)
}

/// `has(m.f)`, `e.all(x, p)`, `e.exists(x, p)`, `e.exists_one(x, p)`,
/// `e.existsOne(x, p)`, `e.map(x, f)`, `e.map(x, p, f)` and `e.filter(x, p)`.
pub fn all_macros() -> Vec<Macro> {
    vec![
        Macro::global("has", 1, make_has),
        Macro::receiver("all", 2, make_all),
        Macro::receiver("exists", 2, make_exists),
        Macro::receiver("exists_one", 2, make_exists_one),
        Macro::receiver("existsOne", 2, make_exists_one),
        Macro::receiver("map", 2, make_map),
        Macro::receiver("map", 3, make_map),
        Macro::receiver("filter", 2, make_filter),
    ]
}

/// Node builder handed to expanders. Nodes it creates are positioned at the
/// macro call.
pub struct MacroExprHelper<'a> {
    factory: &'a mut ExprFactory,
    offset: usize,
}

impl<'a> MacroExprHelper<'a> {
    pub(crate) fn new(factory: &'a mut ExprFactory, offset: usize) -> Self {
        Self { factory, offset }
    }

    pub fn literal(&mut self, value: Literal) -> Expr {
        self.factory.literal(self.offset, value)
    }

    pub fn ident(&mut self, name: &str) -> Expr {
        self.factory.ident(self.offset, name)
    }

    pub fn accu_ident(&mut self) -> Expr {
        self.ident(ACCUMULATOR_NAME)
    }

    pub fn call(&mut self, function: &str, args: Vec<Expr>) -> Expr {
        self.factory.call(self.offset, function, args)
    }

    pub fn list(&mut self, elements: Vec<Expr>) -> Expr {
        self.factory.list(self.offset, elements, Vec::new())
    }

    pub fn presence_test(&mut self, operand: Expr, field: String) -> Expr {
        self.factory.select(self.offset, operand, field, true)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn comprehension(
        &mut self,
        iter_range: Expr,
        iter_var: String,
        accu_var: &str,
        accu_init: Expr,
        loop_condition: Expr,
        loop_step: Expr,
        result: Expr,
    ) -> Expr {
        self.factory.comprehension(
            self.offset,
            ComprehensionExpr {
                iter_range,
                iter_var,
                iter_var2: None,
                accu_var: accu_var.to_string(),
                accu_init,
                loop_condition,
                loop_step,
                result,
            },
        )
    }

    pub fn error(&self, expr_id: ExprId, message: &str) -> MacroError {
        MacroError {
            expr_id: Some(expr_id),
            message: message.to_string(),
        }
    }
}

fn simple_name(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(name.clone()),
        _ => None,
    }
}

/// Resolve the iteration variable of a comprehension macro.
fn iteration_var(
    eh: &MacroExprHelper<'_>,
    arg: &Expr,
    not_ident_message: &str,
) -> Result<String, MacroError> {
    let name = simple_name(arg).ok_or_else(|| eh.error(arg.id, not_ident_message))?;
    if name == ACCUMULATOR_NAME {
        return Err(eh.error(arg.id, "iteration variable overwrites accumulator variable"));
    }
    Ok(name)
}

fn make_has(
    eh: &mut MacroExprHelper<'_>,
    _target: Option<Expr>,
    mut args: Vec<Expr>,
) -> Result<Option<Expr>, MacroError> {
    let arg = args.remove(0);
    match arg.kind {
        ExprKind::Select(select) => Ok(Some(eh.presence_test(*select.operand, select.field))),
        _ => Err(eh.error(arg.id, "invalid argument to has() macro")),
    }
}

#[derive(Clone, Copy)]
enum Quantifier {
    All,
    Exists,
    ExistsOne,
}

fn make_all(
    eh: &mut MacroExprHelper<'_>,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Option<Expr>, MacroError> {
    make_quantifier(Quantifier::All, eh, target, args)
}

fn make_exists(
    eh: &mut MacroExprHelper<'_>,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Option<Expr>, MacroError> {
    make_quantifier(Quantifier::Exists, eh, target, args)
}

fn make_exists_one(
    eh: &mut MacroExprHelper<'_>,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Option<Expr>, MacroError> {
    make_quantifier(Quantifier::ExistsOne, eh, target, args)
}

fn make_quantifier(
    kind: Quantifier,
    eh: &mut MacroExprHelper<'_>,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Option<Expr>, MacroError> {
    let iter_var = iteration_var(eh, &args[0], "argument must be a simple name")?;
    let Some(target) = target else {
        return Ok(None);
    };
    let predicate = args.into_iter().nth(1).ok_or_else(|| MacroError {
        expr_id: None,
        message: "missing predicate".to_string(),
    })?;

    let (init, condition, step, result) = match kind {
        Quantifier::All => {
            let init = eh.literal(Literal::Bool(true));
            let accu = eh.accu_ident();
            let condition = eh.call("@not_strictly_false", vec![accu]);
            let accu = eh.accu_ident();
            let step = eh.call("_&&_", vec![accu, predicate]);
            (init, condition, step, eh.accu_ident())
        }
        Quantifier::Exists => {
            let init = eh.literal(Literal::Bool(false));
            let accu = eh.accu_ident();
            let not_accu = eh.call("!_", vec![accu]);
            let condition = eh.call("@not_strictly_false", vec![not_accu]);
            let accu = eh.accu_ident();
            let step = eh.call("_||_", vec![accu, predicate]);
            (init, condition, step, eh.accu_ident())
        }
        Quantifier::ExistsOne => {
            let init = eh.literal(Literal::Int(0));
            let condition = eh.literal(Literal::Bool(true));
            let accu = eh.accu_ident();
            let one = eh.literal(Literal::Int(1));
            let incremented = eh.call("_+_", vec![accu, one]);
            let accu = eh.accu_ident();
            let step = eh.call("_?_:_", vec![predicate, incremented, accu]);
            let accu = eh.accu_ident();
            let one = eh.literal(Literal::Int(1));
            let result = eh.call("_==_", vec![accu, one]);
            (init, condition, step, result)
        }
    };
    Ok(Some(eh.comprehension(
        target,
        iter_var,
        ACCUMULATOR_NAME,
        init,
        condition,
        step,
        result,
    )))
}

fn make_map(
    eh: &mut MacroExprHelper<'_>,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Option<Expr>, MacroError> {
    let iter_var = iteration_var(eh, &args[0], "argument is not an identifier")?;
    let Some(target) = target else {
        return Ok(None);
    };
    let mut rest = args.into_iter().skip(1);
    let (filter, transform) = match (rest.next(), rest.next()) {
        (Some(filter), Some(transform)) => (Some(filter), transform),
        (Some(transform), None) => (None, transform),
        _ => return Ok(None),
    };

    let init = eh.list(Vec::new());
    let condition = eh.literal(Literal::Bool(true));
    let accu = eh.accu_ident();
    let element = eh.list(vec![transform]);
    let mut step = eh.call("_+_", vec![accu, element]);
    if let Some(filter) = filter {
        let accu = eh.accu_ident();
        step = eh.call("_?_:_", vec![filter, step, accu]);
    }
    let result = eh.accu_ident();
    Ok(Some(eh.comprehension(
        target,
        iter_var,
        ACCUMULATOR_NAME,
        init,
        condition,
        step,
        result,
    )))
}

fn make_filter(
    eh: &mut MacroExprHelper<'_>,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Option<Expr>, MacroError> {
    let iter_var = iteration_var(eh, &args[0], "argument is not an identifier")?;
    let Some(target) = target else {
        return Ok(None);
    };
    let mut args = args.into_iter();
    let (Some(element), Some(filter)) = (args.next(), args.next()) else {
        return Ok(None);
    };

    let init = eh.list(Vec::new());
    let condition = eh.literal(Literal::Bool(true));
    let accu = eh.accu_ident();
    let element = eh.list(vec![element]);
    let appended = eh.call("_+_", vec![accu, element]);
    let accu = eh.accu_ident();
    let step = eh.call("_?_:_", vec![filter, appended, accu]);
    let result = eh.accu_ident();
    Ok(Some(eh.comprehension(
        target,
        iter_var,
        ACCUMULATOR_NAME,
        init,
        condition,
        step,
        result,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(factory: &mut ExprFactory, name: &str) -> Expr {
        factory.ident(0, name)
    }

    #[test]
    fn test_keys() {
        let keys: Vec<String> = all_macros().iter().map(Macro::key).collect();
        assert!(keys.contains(&"has:1:false".to_string()));
        assert!(keys.contains(&"map:3:true".to_string()));
        assert_eq!(var_arg_macro_key("f", true), "f:*:true");
    }

    #[test]
    fn test_has_requires_select() {
        let mut factory = ExprFactory::new();
        let arg = ident(&mut factory, "a");
        let arg_id = arg.id;
        let mut eh = MacroExprHelper::new(&mut factory, 0);
        let err = make_has(&mut eh, None, vec![arg]).unwrap_err();
        assert_eq!(err.expr_id, Some(arg_id));
        assert_eq!(err.message, "invalid argument to has() macro");
    }

    #[test]
    fn test_all_builds_comprehension() {
        let mut factory = ExprFactory::new();
        let target = ident(&mut factory, "list");
        let var = ident(&mut factory, "x");
        let pred = ident(&mut factory, "p");
        let mut eh = MacroExprHelper::new(&mut factory, 0);
        let expr = make_all(&mut eh, Some(target), vec![var, pred]).unwrap().unwrap();
        let ExprKind::Comprehension(comp) = expr.kind else {
            panic!("expected comprehension");
        };
        assert_eq!(comp.iter_var, "x");
        assert_eq!(comp.accu_var, ACCUMULATOR_NAME);
        assert_eq!(comp.accu_init.kind, ExprKind::Literal(Literal::Bool(true)));
    }

    #[test]
    fn test_iteration_var_cannot_shadow_accumulator() {
        let mut factory = ExprFactory::new();
        let target = ident(&mut factory, "list");
        let var = ident(&mut factory, ACCUMULATOR_NAME);
        let pred = ident(&mut factory, "p");
        let mut eh = MacroExprHelper::new(&mut factory, 0);
        let err = make_filter(&mut eh, Some(target), vec![var, pred]).unwrap_err();
        assert_eq!(err.message, "iteration variable overwrites accumulator variable");
    }
}
