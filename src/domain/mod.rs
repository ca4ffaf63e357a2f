// Domain model for cel-fixtures: the Go source model, fixture shapes,
// extraction and kind annotation.

pub mod adorner;
pub mod extract;
pub mod fixture;
pub mod go_literal;
pub mod shape;
pub mod syntax;
