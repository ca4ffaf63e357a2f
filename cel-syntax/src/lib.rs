//! Parser for the Common Expression Language.
//!
//! ```
//! use cel_syntax::{macros, Parser, Source};
//!
//! let parser = Parser::builder().macros(macros::all_macros()).build().unwrap();
//! let (ast, errors) = parser.parse(&Source::new("[1, 2].all(x, x > 0)"));
//! assert!(errors.is_empty());
//! assert!(ast.is_some());
//! ```

pub mod ast;
pub mod debug;
mod errors;
mod helper;
mod lexer;
pub mod macros;
mod options;
mod parser;
mod source;
mod unescape;

pub use ast::Ast;
pub use errors::{CelError, Errors};
pub use options::{OptionError, ParserBuilder};
pub use parser::Parser;
pub use source::{Location, Source};
pub use unescape::UnescapeError;
