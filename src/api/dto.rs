use serde::{Deserialize, Serialize};

use crate::domain::fixture::{FixtureRecord, RecordResult};

/// Wire shape of one fixture record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserTestDto {
    pub expr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ast: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&FixtureRecord> for ParserTestDto {
    fn from(record: &FixtureRecord) -> Self {
        let (ast, error) = match &record.result {
            RecordResult::Ast(text) => (Some(text.clone()), None),
            RecordResult::Error(text) => (None, Some(text.clone())),
        };
        ParserTestDto {
            expr: record.expression.clone(),
            ast,
            error,
        }
    }
}
