//! Recursive-descent parser.
//!
//! Precedence, lowest first: `?:`, `||`, `&&`, relations, `+ -`, `* / %`,
//! unary `! -`, member postfix (`.f`, `.f(..)`, `[i]`), primary.
//!
//! Errors are collected rather than returned early. Recovery follows the
//! usual single-token deletion / insertion strategy and is bounded by the
//! configured attempt and lookahead limits; exceeding either, or the
//! recursion limit, aborts the run.

use std::collections::HashMap;

use crate::ast::{
    Ast, EntryKind, Expr, ExprId, ExprKind, ListExpr, Literal, MacroCall, MapExpr, StructExpr,
};
use crate::errors::Errors;
use crate::helper::ExprFactory;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::macros::{macro_key, var_arg_macro_key, Macro, MacroExprHelper};
use crate::options::{Options, ParserBuilder};
use crate::source::{Location, Source};
use crate::unescape::unescape;

const RESERVED_IDS: &[&str] = &[
    "as", "break", "const", "continue", "else", "for", "function", "if", "import", "let", "loop",
    "package", "namespace", "return", "var", "void", "while",
];

const PRIMARY_EXPECTED: &str = "{'[', '{', '(', '.', '-', '!', 'true', 'false', 'null', NUM_FLOAT, NUM_INT, NUM_UINT, STRING, BYTES, IDENTIFIER}";

/// A configured parser. Cheap to reuse across many sources.
#[derive(Debug, Clone)]
pub struct Parser {
    options: Options,
    macros: HashMap<String, Macro>,
}

impl Parser {
    pub fn builder() -> ParserBuilder {
        ParserBuilder::new()
    }

    pub(crate) fn new(options: Options) -> Self {
        let macros = options
            .macros
            .iter()
            .map(|m| (m.key(), m.clone()))
            .collect();
        Self { options, macros }
    }

    /// Parse `source`. The AST is only returned when no error was reported.
    pub fn parse(&self, source: &Source) -> (Option<Ast>, Errors) {
        let mut errors = Errors::new(source);
        if let Some(limit) = self.options.expression_size_code_point_limit {
            if source.len() > limit {
                errors.report(
                    Location::NONE,
                    format!(
                        "expression code point size exceeds limit: size: {}, limit {}",
                        source.len(),
                        limit
                    ),
                );
                return (None, errors);
            }
        }

        let (tokens, lex_errors) = tokenize(source.chars());
        for lex_error in lex_errors {
            errors.syntax_error(
                source.location(lex_error.offset),
                &format!("token recognition error at: '{}'", lex_error.text),
            );
        }

        let mut run = ParseRun {
            parser: self,
            source,
            tokens,
            pos: 0,
            errors,
            factory: ExprFactory::new(),
            depth: 0,
            recovery_attempts: 0,
            in_error_recovery: false,
        };
        let result = run.parse_start();
        let ParseRun {
            errors, factory, ..
        } = run;

        match result {
            Ok(expr) if errors.is_empty() => {
                let source_info = factory.into_source_info(source.line_offsets().to_vec());
                (Some(Ast { expr, source_info }), errors)
            }
            _ => (None, errors),
        }
    }
}

/// Raised when a limit is exceeded; the error has already been reported.
struct Abort;

type Step<T> = Result<T, Abort>;

struct ParseRun<'a> {
    parser: &'a Parser,
    source: &'a Source,
    tokens: Vec<Token>,
    pos: usize,
    errors: Errors,
    factory: ExprFactory,
    depth: usize,
    recovery_attempts: usize,
    /// Set after a syntax error until the next successfully matched token;
    /// further syntax errors are suppressed meanwhile.
    in_error_recovery: bool,
}

impl<'a> ParseRun<'a> {
    // ═══════════════════════════════════════════════════════════════
    // Token access
    // ═══════════════════════════════════════════════════════════════

    fn token_at(&self, index: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[index.min(last)]
    }

    fn peek(&self) -> &Token {
        self.token_at(self.pos)
    }

    fn peek_kind(&self, ahead: usize) -> TokenKind {
        self.token_at(self.pos + ahead).kind
    }

    /// Consume the current token as a successful match.
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.skip();
        self.in_error_recovery = false;
        token
    }

    /// Consume the current token during recovery.
    fn skip(&mut self) {
        if self.peek().kind != TokenKind::Eof {
            self.pos += 1;
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Errors, limits, recovery
    // ═══════════════════════════════════════════════════════════════

    fn enter(&mut self) -> Step<()> {
        self.depth += 1;
        if let Some(max) = self.parser.options.max_recursion_depth {
            if self.depth > max {
                self.errors
                    .internal_error(format!("expression recursion limit exceeded: {}", max));
                return Err(Abort);
            }
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    /// Report an error found while building the tree.
    fn report_at(&mut self, offset: usize, message: &str) -> Expr {
        let expr = self.factory.unspecified(offset);
        self.errors.report(self.source.location(offset), message);
        expr
    }

    fn report_syntax(&mut self, offset: usize, message: &str) {
        if self.in_error_recovery {
            return;
        }
        self.in_error_recovery = true;
        self.errors.syntax_error(self.source.location(offset), message);
    }

    fn begin_recovery(&mut self) -> Step<()> {
        if let Some(limit) = self.parser.options.error_recovery_limit {
            if self.recovery_attempts == limit {
                self.recovery_attempts += 1;
                let offset = self.peek().offset;
                self.errors.syntax_error(
                    self.source.location(offset),
                    &format!("error recovery attempt limit exceeded: {}", limit),
                );
                return Err(Abort);
            }
        }
        self.recovery_attempts += 1;
        Ok(())
    }

    /// Skip ahead to a token that can end or continue an expression.
    fn resync(&mut self) -> Step<()> {
        let limit = self.parser.options.error_recovery_lookahead_token_limit;
        let mut skipped = 0;
        while !is_resync_point(self.peek().kind) {
            if skipped == limit {
                self.errors.internal_error(format!(
                    "error recovery token lookahead limit exceeded: {}",
                    limit
                ));
                return Err(Abort);
            }
            self.skip();
            skipped += 1;
        }
        Ok(())
    }

    /// Match `kind`, recovering by deleting one unwanted token or by
    /// assuming the expected one is missing. Returns the offset of the
    /// matched (or assumed) token.
    fn expect(&mut self, kind: TokenKind, display: &str) -> Step<usize> {
        if self.peek().kind == kind {
            return Ok(self.advance().offset);
        }
        self.begin_recovery()?;
        let current = self.peek().clone();
        if self.peek_kind(1) == kind {
            self.report_syntax(
                current.offset,
                &format!("extraneous input '{}' expecting {}", current.display(), display),
            );
            self.skip();
            return Ok(self.advance().offset);
        }
        if is_resync_point(current.kind) {
            self.report_syntax(
                current.offset,
                &format!("missing {} at '{}'", display, current.display()),
            );
            return Ok(current.offset);
        }
        self.report_syntax(
            current.offset,
            &format!("mismatched input '{}' expecting {}", current.display(), display),
        );
        self.resync()?;
        if self.peek().kind == kind {
            return Ok(self.advance().offset);
        }
        Ok(current.offset)
    }

    fn mismatch(&mut self, expecting: &str) -> Step<Expr> {
        let current = self.peek().clone();
        self.report_syntax(
            current.offset,
            &format!("mismatched input '{}' expecting {}", current.display(), expecting),
        );
        self.begin_recovery()?;
        self.resync()?;
        Ok(self.factory.unspecified(current.offset))
    }

    // ═══════════════════════════════════════════════════════════════
    // Macro expansion
    // ═══════════════════════════════════════════════════════════════

    fn global_call_or_macro(&mut self, id: ExprId, function: &str, args: Vec<Expr>) -> Expr {
        match self.expand_macro(id, function, None, args) {
            Ok(expr) => expr,
            Err((_, args)) => ExprFactory::call_with_id(id, function, None, args),
        }
    }

    fn receiver_call_or_macro(
        &mut self,
        id: ExprId,
        function: &str,
        target: Expr,
        args: Vec<Expr>,
    ) -> Expr {
        match self.expand_macro(id, function, Some(target), args) {
            Ok(expr) => expr,
            Err((target, args)) => ExprFactory::call_with_id(id, function, target, args),
        }
    }

    /// Expand a macro registered for the call shape. When no macro applies
    /// the target and arguments are handed back unchanged.
    #[allow(clippy::type_complexity)]
    fn expand_macro(
        &mut self,
        id: ExprId,
        function: &str,
        target: Option<Expr>,
        args: Vec<Expr>,
    ) -> Result<Expr, (Option<Expr>, Vec<Expr>)> {
        let parser = self.parser;
        let receiver_style = target.is_some();
        let found = parser
            .macros
            .get(&macro_key(function, args.len(), receiver_style))
            .or_else(|| parser.macros.get(&var_arg_macro_key(function, receiver_style)));
        let Some(found) = found else {
            return Err((target, args));
        };

        let expander = found.expander();
        let offset = self.factory.position(id).unwrap_or(0);
        let surface_target = target.clone();
        let surface_args = args.clone();
        let mut helper = MacroExprHelper::new(&mut self.factory, offset);
        match expander(&mut helper, target, args) {
            Ok(Some(expr)) => {
                if parser.options.populate_macro_calls {
                    self.factory.add_macro_call(
                        expr.id,
                        MacroCall {
                            function: function.to_string(),
                            target: surface_target,
                            args: surface_args,
                        },
                    );
                }
                self.factory.delete_id(id);
                Ok(expr)
            }
            Ok(None) => Err((surface_target, surface_args)),
            Err(err) => {
                let error_offset = err
                    .expr_id
                    .and_then(|expr_id| self.factory.position(expr_id))
                    .unwrap_or(offset);
                self.factory.delete_id(id);
                Ok(self.report_at(error_offset, &err.message))
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Grammar
    // ═══════════════════════════════════════════════════════════════

    fn parse_start(&mut self) -> Step<Expr> {
        let expr = self.parse_expr()?;
        if self.peek().kind != TokenKind::Eof {
            self.begin_recovery()?;
            let current = self.peek().clone();
            let verb = if self.peek_kind(1) == TokenKind::Eof {
                "extraneous"
            } else {
                "mismatched"
            };
            self.report_syntax(
                current.offset,
                &format!("{} input '{}' expecting <EOF>", verb, current.display()),
            );
        }
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Step<Expr> {
        self.enter()?;
        let condition = self.parse_conditional_or()?;
        if self.peek().kind != TokenKind::Question {
            self.leave(1);
            return Ok(condition);
        }
        let op = self.advance();
        let id = self.factory.id(op.offset);
        let if_true = self.parse_conditional_or()?;
        self.expect(TokenKind::Colon, "':'")?;
        let if_false = self.parse_expr()?;
        self.leave(1);
        Ok(self.global_call_or_macro(id, "_?_:_", vec![condition, if_true, if_false]))
    }

    fn parse_conditional_or(&mut self) -> Step<Expr> {
        let first = self.parse_conditional_and()?;
        let mut logic = LogicManager::new("_||_", first, self.variadic());
        while self.peek().kind == TokenKind::Or {
            let op = self.advance();
            let id = self.factory.id(op.offset);
            let next = self.parse_conditional_and()?;
            logic.add_term(id, next);
        }
        Ok(logic.into_expr())
    }

    fn parse_conditional_and(&mut self) -> Step<Expr> {
        let first = self.parse_relation()?;
        let mut logic = LogicManager::new("_&&_", first, self.variadic());
        while self.peek().kind == TokenKind::And {
            let op = self.advance();
            let id = self.factory.id(op.offset);
            let next = self.parse_relation()?;
            logic.add_term(id, next);
        }
        Ok(logic.into_expr())
    }

    fn variadic(&self) -> bool {
        self.parser.options.enable_variadic_operator_asts
    }

    fn parse_relation(&mut self) -> Step<Expr> {
        self.parse_binary_chain(relation_operator, Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Step<Expr> {
        self.parse_binary_chain(additive_operator, Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Step<Expr> {
        self.parse_binary_chain(multiplicative_operator, Self::parse_unary)
    }

    /// Left-associative chain of one precedence level.
    fn parse_binary_chain(
        &mut self,
        operator: fn(TokenKind) -> Option<&'static str>,
        operand: fn(&mut Self) -> Step<Expr>,
    ) -> Step<Expr> {
        let mut lhs = operand(self)?;
        let mut levels = 0;
        while let Some(function) = operator(self.peek().kind) {
            self.enter()?;
            levels += 1;
            let op = self.advance();
            let id = self.factory.id(op.offset);
            let rhs = operand(self)?;
            lhs = self.global_call_or_macro(id, function, vec![lhs, rhs]);
        }
        self.leave(levels);
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Step<Expr> {
        match self.peek().kind {
            TokenKind::Not => self.parse_prefix_run(TokenKind::Not, "!_"),
            // A lone minus before a number is part of the literal.
            TokenKind::Minus
                if matches!(self.peek_kind(1), TokenKind::Int | TokenKind::Double) =>
            {
                self.parse_member()
            }
            TokenKind::Minus => self.parse_prefix_run(TokenKind::Minus, "-_"),
            _ => self.parse_member(),
        }
    }

    /// A run of `!` or `-`. Pairs cancel out.
    fn parse_prefix_run(&mut self, kind: TokenKind, function: &str) -> Step<Expr> {
        let first = self.peek().offset;
        let mut count = 0;
        // A run nests one level however long it is.
        self.enter()?;
        while self.peek().kind == kind {
            self.advance();
            count += 1;
        }
        let operand = self.parse_member()?;
        self.leave(1);
        if count % 2 == 0 {
            return Ok(operand);
        }
        let id = self.factory.id(first);
        Ok(self.global_call_or_macro(id, function, vec![operand]))
    }

    fn parse_member(&mut self) -> Step<Expr> {
        let mut operand = self.parse_primary()?;
        let mut levels = 0;
        loop {
            operand = match self.peek().kind {
                TokenKind::Dot => {
                    self.enter()?;
                    levels += 1;
                    self.parse_member_dot(operand)?
                }
                TokenKind::LBracket => {
                    self.enter()?;
                    levels += 1;
                    self.parse_index(operand)?
                }
                _ => break,
            };
        }
        self.leave(levels);
        Ok(operand)
    }

    fn parse_member_dot(&mut self, operand: Expr) -> Step<Expr> {
        let dot = self.advance();
        let optional = if self.peek().kind == TokenKind::Question {
            Some(self.advance())
        } else {
            None
        };

        let field = match self.peek().kind {
            TokenKind::Ident => {
                let name = self.advance();
                if optional.is_none() && self.peek().kind == TokenKind::LParen {
                    let open = self.advance();
                    let id = self.factory.id(open.offset);
                    let args = self.parse_call_args()?;
                    return Ok(self.receiver_call_or_macro(id, &name.text, operand, args));
                }
                name.text
            }
            TokenKind::EscIdent => match self.escaped_ident() {
                Ok(name) => name,
                Err(expr) => return Ok(expr),
            },
            _ => {
                let current = self.peek().clone();
                let input = match current.kind {
                    TokenKind::Eof => dot.text.clone(),
                    _ => format!("{}{}", dot.text, current.text),
                };
                self.report_syntax(
                    current.offset,
                    &format!("no viable alternative at input '{}'", input),
                );
                self.begin_recovery()?;
                self.resync()?;
                return Ok(self.factory.unspecified(current.offset));
            }
        };

        if optional.is_some() {
            if !self.parser.options.enable_optional_syntax {
                return Ok(self.report_at(dot.offset, "unsupported syntax '.?'"));
            }
            let id = self.factory.id(dot.offset);
            let name = self.factory.literal(dot.offset, Literal::String(field));
            return Ok(self.global_call_or_macro(id, "_?._", vec![operand, name]));
        }
        Ok(self.factory.select(dot.offset, operand, field, false))
    }

    /// Consume a backtick identifier, yielding its unquoted name or the
    /// error node when escapes are disabled.
    fn escaped_ident(&mut self) -> Result<String, Expr> {
        let token = self.advance();
        if !self.parser.options.enable_ident_escape_syntax {
            return Err(self.report_at(token.offset, "unsupported syntax '`'"));
        }
        let inner = token.text.trim_start_matches('`').trim_end_matches('`');
        Ok(inner.to_string())
    }

    fn parse_index(&mut self, operand: Expr) -> Step<Expr> {
        let open = self.advance();
        let id = self.factory.id(open.offset);
        let optional = self.peek().kind == TokenKind::Question;
        if optional {
            self.advance();
        }
        let index = self.parse_expr()?;
        self.expect(TokenKind::RBracket, "']'")?;
        if optional {
            if !self.parser.options.enable_optional_syntax {
                self.factory.delete_id(id);
                return Ok(self.report_at(open.offset, "unsupported syntax '[?'"));
            }
            return Ok(self.global_call_or_macro(id, "_[?_]", vec![operand, index]));
        }
        Ok(self.global_call_or_macro(id, "_[_]", vec![operand, index]))
    }

    /// Arguments after an already consumed `(`, through the closing `)`.
    fn parse_call_args(&mut self) -> Step<Vec<Expr>> {
        let mut args = Vec::new();
        if self.peek().kind != TokenKind::RParen {
            loop {
                args.push(self.parse_expr()?);
                if self.peek().kind != TokenKind::Comma {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Step<Expr> {
        match self.peek().kind {
            TokenKind::Dot | TokenKind::Ident => {
                if self.is_message_start() {
                    self.parse_message()
                } else {
                    self.parse_ident_or_call()
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_map(),
            TokenKind::Minus if matches!(self.peek_kind(1), TokenKind::Int | TokenKind::Double) => {
                self.parse_literal()
            }
            TokenKind::Int
            | TokenKind::Uint
            | TokenKind::Double
            | TokenKind::String
            | TokenKind::Bytes
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null => self.parse_literal(),
            _ => {
                if self.peek().kind != TokenKind::Eof && can_start_primary(self.peek_kind(1)) {
                    self.begin_recovery()?;
                    let current = self.peek().clone();
                    self.report_syntax(
                        current.offset,
                        &format!(
                            "extraneous input '{}' expecting {}",
                            current.display(),
                            PRIMARY_EXPECTED
                        ),
                    );
                    self.skip();
                    return self.parse_primary();
                }
                self.mismatch(PRIMARY_EXPECTED)
            }
        }
    }

    /// `[.]IDENT(.IDENT)* {` starts a message construction.
    fn is_message_start(&self) -> bool {
        let mut i = self.pos;
        if self.token_at(i).kind == TokenKind::Dot {
            i += 1;
        }
        if self.token_at(i).kind != TokenKind::Ident {
            return false;
        }
        i += 1;
        while self.token_at(i).kind == TokenKind::Dot && self.token_at(i + 1).kind == TokenKind::Ident {
            i += 2;
        }
        self.token_at(i).kind == TokenKind::LBrace
    }

    fn parse_ident_or_call(&mut self) -> Step<Expr> {
        let start = self.peek().offset;
        let mut name = String::new();
        if self.peek().kind == TokenKind::Dot {
            self.advance();
            name.push('.');
        }
        if self.peek().kind != TokenKind::Ident {
            return self.mismatch("IDENTIFIER");
        }
        let ident = self.advance();
        name.push_str(&ident.text);

        let call = if self.peek().kind == TokenKind::LParen {
            let open = self.advance();
            let id = self.factory.id(open.offset);
            let args = self.parse_call_args()?;
            Some((id, args))
        } else {
            None
        };

        if RESERVED_IDS.contains(&ident.text.as_str()) {
            if let Some((id, _)) = call {
                self.factory.delete_id(id);
            }
            return Ok(self.report_at(start, &format!("reserved identifier: {}", ident.text)));
        }
        match call {
            Some((id, args)) => Ok(self.global_call_or_macro(id, &name, args)),
            None => Ok(self.factory.ident(ident.offset, name)),
        }
    }

    fn parse_message(&mut self) -> Step<Expr> {
        let mut type_name = String::new();
        if self.peek().kind == TokenKind::Dot {
            self.advance();
            type_name.push('.');
        }
        type_name.push_str(&self.advance().text);
        while self.peek().kind == TokenKind::Dot {
            self.advance();
            type_name.push('.');
            type_name.push_str(&self.advance().text);
        }
        let open = self.advance();
        let id = self.factory.id(open.offset);

        let mut fields = Vec::new();
        self.skip_empty_trailing_comma(TokenKind::RBrace);
        while !matches!(self.peek().kind, TokenKind::RBrace | TokenKind::Eof) {
            let optional = self.optional_marker();
            let name = match self.peek().kind {
                TokenKind::Ident => self.advance().text,
                TokenKind::EscIdent => match self.escaped_ident() {
                    Ok(name) => name,
                    Err(_) => String::new(),
                },
                _ => {
                    self.mismatch("IDENTIFIER")?;
                    break;
                }
            };
            let colon = self.expect(TokenKind::Colon, "':'")?;
            let value = self.parse_expr()?;
            if let Some(optional) = optional {
                fields.push(self.factory.entry(
                    colon,
                    EntryKind::StructField {
                        name,
                        value,
                        optional,
                    },
                ));
            }
            if self.peek().kind != TokenKind::Comma {
                break;
            }
            self.advance();
        }
        self.expect(TokenKind::RBrace, "'}'")?;

        Ok(Expr {
            id,
            kind: ExprKind::Struct(StructExpr { type_name, fields }),
        })
    }

    fn parse_map(&mut self) -> Step<Expr> {
        let open = self.advance();
        let id = self.factory.id(open.offset);

        let mut entries = Vec::new();
        self.skip_empty_trailing_comma(TokenKind::RBrace);
        while !matches!(self.peek().kind, TokenKind::RBrace | TokenKind::Eof) {
            let optional = self.optional_marker();
            let key = self.parse_expr()?;
            let colon = self.expect(TokenKind::Colon, "':'")?;
            let value = self.parse_expr()?;
            if let Some(optional) = optional {
                entries.push(self.factory.entry(
                    colon,
                    EntryKind::MapEntry {
                        key,
                        value,
                        optional,
                    },
                ));
            }
            if self.peek().kind != TokenKind::Comma {
                break;
            }
            self.advance();
        }
        self.expect(TokenKind::RBrace, "'}'")?;

        Ok(Expr {
            id,
            kind: ExprKind::Map(MapExpr { entries }),
        })
    }

    fn parse_list(&mut self) -> Step<Expr> {
        let open = self.advance();
        let id = self.factory.id(open.offset);

        let mut elements = Vec::new();
        let mut optional_indices = Vec::new();
        self.skip_empty_trailing_comma(TokenKind::RBracket);
        while !matches!(self.peek().kind, TokenKind::RBracket | TokenKind::Eof) {
            let optional = self.optional_marker();
            let element = self.parse_expr()?;
            match optional {
                Some(true) => {
                    optional_indices.push(elements.len());
                    elements.push(element);
                }
                Some(false) => elements.push(element),
                None => {}
            }
            if self.peek().kind != TokenKind::Comma {
                break;
            }
            self.advance();
        }
        self.expect(TokenKind::RBracket, "']'")?;

        Ok(Expr {
            id,
            kind: ExprKind::List(ListExpr {
                elements,
                optional_indices,
            }),
        })
    }

    /// `[,]` and `{,}` are empty literals.
    fn skip_empty_trailing_comma(&mut self, close: TokenKind) {
        if self.peek().kind == TokenKind::Comma && self.peek_kind(1) == close {
            self.advance();
        }
    }

    /// Consume a leading `?`. Yields `Some(is_optional)` for an element to
    /// keep, `None` when the marker was rejected and the element dropped.
    fn optional_marker(&mut self) -> Option<bool> {
        if self.peek().kind != TokenKind::Question {
            return Some(false);
        }
        let marker = self.advance();
        if !self.parser.options.enable_optional_syntax {
            self.report_at(marker.offset, "unsupported syntax '?'");
            return None;
        }
        Some(true)
    }

    fn parse_literal(&mut self) -> Step<Expr> {
        let start = self.peek().offset;
        let negative = self.peek().kind == TokenKind::Minus;
        if negative {
            self.advance();
        }
        let token = self.advance();
        let sign = if negative { "-" } else { "" };

        let value = match token.kind {
            TokenKind::Int => {
                let (digits, radix) = match token.text.strip_prefix("0x") {
                    Some(hex) => (hex, 16),
                    None => (token.text.as_str(), 10),
                };
                match i64::from_str_radix(&format!("{}{}", sign, digits), radix) {
                    Ok(v) => Literal::Int(v),
                    Err(_) => return Ok(self.report_at(start, "invalid int literal")),
                }
            }
            TokenKind::Uint => {
                let text = &token.text[..token.text.len() - 1];
                let (digits, radix) = match text.strip_prefix("0x") {
                    Some(hex) => (hex, 16),
                    None => (text, 10),
                };
                match u64::from_str_radix(digits, radix) {
                    Ok(v) => Literal::Uint(v),
                    Err(_) => return Ok(self.report_at(start, "invalid uint literal")),
                }
            }
            TokenKind::Double => match format!("{}{}", sign, token.text).parse::<f64>() {
                Ok(v) if v.is_finite() => Literal::Double(v),
                _ => return Ok(self.report_at(start, "invalid double literal")),
            },
            TokenKind::String => match unescape(&token.text, false) {
                Ok(bytes) => Literal::String(String::from_utf8_lossy(&bytes).into_owned()),
                Err(err) => return Ok(self.report_at(start, &err.to_string())),
            },
            TokenKind::Bytes => match unescape(&token.text[1..], true) {
                Ok(bytes) => Literal::Bytes(bytes),
                Err(err) => return Ok(self.report_at(start, &err.to_string())),
            },
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            _ => Literal::Null,
        };
        Ok(self.factory.literal(start, value))
    }
}

fn relation_operator(kind: TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Lt => Some("_<_"),
        TokenKind::Le => Some("_<=_"),
        TokenKind::Ge => Some("_>=_"),
        TokenKind::Gt => Some("_>_"),
        TokenKind::Eq => Some("_==_"),
        TokenKind::Ne => Some("_!=_"),
        TokenKind::In => Some("@in"),
        _ => None,
    }
}

fn additive_operator(kind: TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Plus => Some("_+_"),
        TokenKind::Minus => Some("_-_"),
        _ => None,
    }
}

fn multiplicative_operator(kind: TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Star => Some("_*_"),
        TokenKind::Slash => Some("_/_"),
        TokenKind::Percent => Some("_%_"),
        _ => None,
    }
}

fn can_start_primary(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::LParen
            | TokenKind::Dot
            | TokenKind::Minus
            | TokenKind::Not
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::Double
            | TokenKind::Int
            | TokenKind::Uint
            | TokenKind::String
            | TokenKind::Bytes
            | TokenKind::Ident
    )
}

/// Tokens at which an expression can end, so recovery may stop there.
fn is_resync_point(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace
            | TokenKind::Comma
            | TokenKind::Colon
            | TokenKind::Question
            | TokenKind::Eof
    ) || relation_operator(kind).is_some()
        || additive_operator(kind).is_some()
        || multiplicative_operator(kind).is_some()
        || matches!(kind, TokenKind::And | TokenKind::Or)
}

/// Combines `&&` / `||` chains into one variadic call or a balanced tree.
struct LogicManager {
    function: &'static str,
    terms: Vec<Expr>,
    ops: Vec<ExprId>,
    variadic: bool,
}

impl LogicManager {
    fn new(function: &'static str, first: Expr, variadic: bool) -> Self {
        Self {
            function,
            terms: vec![first],
            ops: Vec::new(),
            variadic,
        }
    }

    fn add_term(&mut self, op: ExprId, term: Expr) {
        self.ops.push(op);
        self.terms.push(term);
    }

    fn into_expr(self) -> Expr {
        if self.ops.is_empty() {
            return subtree(self.function, self.terms, self.ops);
        }
        if self.variadic {
            return ExprFactory::call_with_id(self.ops[0], self.function, None, self.terms);
        }
        balanced_tree(self.function, self.terms, self.ops)
    }
}

/// `terms.len() == ops.len() + 1`, `ops` non-empty.
fn balanced_tree(function: &str, mut terms: Vec<Expr>, mut ops: Vec<ExprId>) -> Expr {
    let mid = ops.len() / 2;
    let right_terms = terms.split_off(mid + 1);
    let right_ops = ops.split_off(mid + 1);
    let op = ops.remove(mid);
    let left = subtree(function, terms, ops);
    let right = subtree(function, right_terms, right_ops);
    ExprFactory::call_with_id(op, function, None, vec![left, right])
}

fn subtree(function: &str, mut terms: Vec<Expr>, ops: Vec<ExprId>) -> Expr {
    if ops.is_empty() {
        return terms.pop().unwrap_or(Expr {
            id: 0,
            kind: ExprKind::Unspecified,
        });
    }
    balanced_tree(function, terms, ops)
}
