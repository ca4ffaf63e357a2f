//! Human-readable rendering of expression trees.
//!
//! The layout is stable and indentation-sensitive so that renderings can be
//! diffed. An [`Adorner`] may attach text after every expression and every
//! map or struct entry.

use std::cmp::Ordering;

use crate::ast::{
    CallExpr, ComprehensionExpr, EntryExpr, EntryKind, Expr, ExprKind, ListExpr, Literal, MapExpr,
    SelectExpr, StructExpr,
};

/// Element handed to an [`Adorner`].
#[derive(Debug, Clone, Copy)]
pub enum Adornable<'a> {
    Expr(&'a Expr),
    Entry(&'a EntryExpr),
}

pub trait Adorner {
    /// Text appended directly after the rendering of `elem`.
    fn metadata(&self, elem: Adornable<'_>) -> String;
}

struct EmptyAdorner;

impl Adorner for EmptyAdorner {
    fn metadata(&self, _elem: Adornable<'_>) -> String {
        String::new()
    }
}

pub fn to_debug_string(expr: &Expr) -> String {
    to_adorned_debug_string(expr, &EmptyAdorner)
}

pub fn to_adorned_debug_string(expr: &Expr, adorner: &dyn Adorner) -> String {
    let mut writer = DebugWriter {
        adorner,
        buffer: String::new(),
        indent: 0,
        line_start: true,
    };
    writer.buffer_expr(expr);
    writer.buffer
}

struct DebugWriter<'a> {
    adorner: &'a dyn Adorner,
    buffer: String,
    indent: usize,
    line_start: bool,
}

impl DebugWriter<'_> {
    fn buffer_expr(&mut self, e: &Expr) {
        match &e.kind {
            ExprKind::Literal(lit) => self.append(&format_literal(lit)),
            ExprKind::Ident(name) => self.append(name),
            ExprKind::Select(sel) => self.append_select(sel),
            ExprKind::Call(call) => self.append_call(call),
            ExprKind::List(list) => self.append_list(list),
            ExprKind::Map(map) => self.append_map(map),
            ExprKind::Struct(obj) => self.append_struct(obj),
            ExprKind::Comprehension(comp) => self.append_comprehension(comp),
            ExprKind::Unspecified => {}
        }
        self.adorn(Adornable::Expr(e));
    }

    fn append_select(&mut self, sel: &SelectExpr) {
        self.buffer_expr(&sel.operand);
        self.append(".");
        self.append(&sel.field);
        if sel.test_only {
            self.append("~test-only");
        }
    }

    fn append_call(&mut self, call: &CallExpr) {
        if let Some(target) = &call.target {
            self.buffer_expr(target);
            self.append(".");
        }
        self.append(&call.function);
        self.append("(");
        if !call.args.is_empty() {
            self.add_indent();
            self.append_line();
            for (i, arg) in call.args.iter().enumerate() {
                if i > 0 {
                    self.append(",");
                    self.append_line();
                }
                self.buffer_expr(arg);
            }
            self.remove_indent();
            self.append_line();
        }
        self.append(")");
    }

    fn append_list(&mut self, list: &ListExpr) {
        self.append("[");
        if !list.elements.is_empty() {
            self.append_line();
            self.add_indent();
            for (i, elem) in list.elements.iter().enumerate() {
                if i > 0 {
                    self.append(",");
                    self.append_line();
                }
                if list.is_optional(i) {
                    self.append("?");
                }
                self.buffer_expr(elem);
            }
            self.remove_indent();
            self.append_line();
        }
        self.append("]");
    }

    fn append_struct(&mut self, obj: &StructExpr) {
        self.append(&obj.type_name);
        self.append("{");
        self.append_entries(&obj.fields);
        self.append("}");
    }

    fn append_map(&mut self, map: &MapExpr) {
        self.append("{");
        self.append_entries(&map.entries);
        self.append("}");
    }

    fn append_entries(&mut self, entries: &[EntryExpr]) {
        if entries.is_empty() {
            return;
        }
        self.append_line();
        self.add_indent();
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                self.append(",");
                self.append_line();
            }
            match &entry.kind {
                EntryKind::StructField {
                    name,
                    value,
                    optional,
                } => {
                    if *optional {
                        self.append("?");
                    }
                    self.append(name);
                    self.append(":");
                    self.buffer_expr(value);
                }
                EntryKind::MapEntry {
                    key,
                    value,
                    optional,
                } => {
                    if *optional {
                        self.append("?");
                    }
                    self.buffer_expr(key);
                    self.append(":");
                    self.buffer_expr(value);
                }
            }
            self.adorn(Adornable::Entry(entry));
        }
        self.remove_indent();
        self.append_line();
    }

    fn append_comprehension(&mut self, comp: &ComprehensionExpr) {
        self.append("__comprehension__(");
        self.add_indent();
        self.append_line();
        self.append("// Variable");
        self.append_line();
        self.append(&comp.iter_var);
        self.append(",");
        self.append_line();
        if let Some(iter_var2) = &comp.iter_var2 {
            self.append(iter_var2);
            self.append(",");
            self.append_line();
        }
        self.append("// Target");
        self.append_line();
        self.buffer_expr(&comp.iter_range);
        self.append(",");
        self.append_line();
        self.append("// Accumulator");
        self.append_line();
        self.append(&comp.accu_var);
        self.append(",");
        self.append_line();
        self.append("// Init");
        self.append_line();
        self.buffer_expr(&comp.accu_init);
        self.append(",");
        self.append_line();
        self.append("// LoopCondition");
        self.append_line();
        self.buffer_expr(&comp.loop_condition);
        self.append(",");
        self.append_line();
        self.append("// LoopStep");
        self.append_line();
        self.buffer_expr(&comp.loop_step);
        self.append(",");
        self.append_line();
        self.append("// Result");
        self.append_line();
        self.buffer_expr(&comp.result);
        self.append(")");
        self.remove_indent();
    }

    fn adorn(&mut self, elem: Adornable<'_>) {
        let metadata = self.adorner.metadata(elem);
        self.append(&metadata);
    }

    fn append(&mut self, s: &str) {
        if self.line_start {
            self.line_start = false;
            for _ in 0..self.indent {
                self.buffer.push_str("  ");
            }
        }
        self.buffer.push_str(s);
    }

    fn append_line(&mut self) {
        self.buffer.push('\n');
        self.line_start = true;
    }

    fn add_indent(&mut self) {
        self.indent += 1;
    }

    fn remove_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }
}

pub fn format_literal(lit: &Literal) -> String {
    match lit {
        Literal::Bool(v) => v.to_string(),
        Literal::Bytes(v) => format!("b{}", quote(v)),
        Literal::Double(v) => format_double(*v),
        Literal::Int(v) => v.to_string(),
        Literal::Null => "null".to_string(),
        Literal::String(v) => quote(v.as_bytes()),
        Literal::Uint(v) => format!("{}u", v),
    }
}

/// Double-quote `bytes`, escaping non-printable characters. Bytes that are
/// not valid UTF-8 are written as `\xNN`.
pub fn quote(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            push_escaped(&mut out, c);
        }
        for b in chunk.invalid() {
            out.push_str(&format!("\\x{:02x}", b));
        }
    }
    out.push('"');
    out
}

fn push_escaped(out: &mut String, c: char) {
    if c == '"' || c == '\\' {
        out.push('\\');
        out.push(c);
        return;
    }
    if is_print(c) {
        out.push(c);
        return;
    }
    match c {
        '\u{07}' => out.push_str("\\a"),
        '\u{08}' => out.push_str("\\b"),
        '\u{0c}' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{0b}' => out.push_str("\\v"),
        c if (c as u32) < 0x20 || c == '\u{7f}' => out.push_str(&format!("\\x{:02x}", c as u32)),
        c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push_str(&format!("\\U{:08x}", c as u32)),
    }
}

/// Unassigned code points and noncharacters, sorted. Covers the gaps of the
/// older BMP blocks and the unassigned tails of the supplementary planes;
/// gaps elsewhere still count as printable.
const UNASSIGNED: &[(u32, u32)] = &[
    (0x0378, 0x0379),
    (0x0380, 0x0383),
    (0x038B, 0x038B),
    (0x038D, 0x038D),
    (0x03A2, 0x03A2),
    (0x0530, 0x0530),
    (0x0557, 0x0558),
    (0x058B, 0x058C),
    (0x0590, 0x0590),
    (0x05C8, 0x05CF),
    (0x05EB, 0x05EE),
    (0x05F5, 0x05FF),
    (0x070E, 0x070E),
    (0x074B, 0x074C),
    (0x07B2, 0x07BF),
    (0x07FB, 0x07FC),
    (0x082E, 0x082F),
    (0x083F, 0x083F),
    (0x085C, 0x085D),
    (0x085F, 0x085F),
    (0x086B, 0x086F),
    (0x088F, 0x088F),
    (0x0892, 0x0897),
    (0xFDD0, 0xFDEF),
    (0xFFF0, 0xFFF8),
    (0xFFFE, 0xFFFF),
    (0x1FBFA, 0x1FFFF),
    (0x2A6E0, 0x2A6FF),
    (0x2FA1E, 0x2FFFF),
    (0x323B0, 0xE00FF),
    (0xE01F0, 0xEFFFF),
];

fn is_unassigned(c: char) -> bool {
    let c = c as u32;
    UNASSIGNED
        .binary_search_by(|&(lo, hi)| {
            if hi < c {
                Ordering::Less
            } else if lo > c {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        })
        .is_ok()
}

/// Printable means graphic or the ASCII space.
fn is_print(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() || is_unassigned(c) {
        return false;
    }
    !matches!(
        c as u32,
        0x00AD
            | 0x0600..=0x0605
            | 0x061C
            | 0x06DD
            | 0x070F
            | 0x180E
            | 0x200B..=0x200F
            | 0x202A..=0x202E
            | 0x2060..=0x206F
            | 0xE000..=0xF8FF
            | 0xFEFF
            | 0xFFF9..=0xFFFB
            | 0xF0000..=0x10FFFF
    )
}

/// Shortest representation that round-trips, switching to exponent form
/// below 1e-4 and from 1e6 upwards.
pub fn format_double(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let sci = format!("{:e}", v.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exponent.parse().unwrap_or(0);
    let digits: Vec<char> = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let nd = digits.len() as i32;

    let mut out = String::new();
    if v < 0.0 {
        out.push('-');
    }

    if !(-4..6).contains(&exp) {
        out.push(digits[0]);
        if nd > 1 {
            out.push('.');
            out.extend(&digits[1..]);
        }
        out.push('e');
        out.push(if exp < 0 { '-' } else { '+' });
        out.push_str(&format!("{:02}", exp.abs()));
        return out;
    }

    let dp = exp + 1;
    if dp > 0 {
        for i in 0..dp {
            out.push(*digits.get(i as usize).unwrap_or(&'0'));
        }
    } else {
        out.push('0');
    }
    let frac = (nd - dp).max(0);
    if frac > 0 {
        out.push('.');
        for i in 1..=frac {
            let index = dp - 1 + i;
            out.push(if index < 0 { '0' } else { digits[index as usize] });
        }
    }
    out
}
