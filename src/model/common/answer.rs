use serde::{Deserialize, Serialize};

use crate::model::common::question::QuestionType;

/// A submitted answer value, before coercion into its stored form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Number(f64),
}

impl AnswerValue {
    /// Is this answer effectively blank? Strings are checked after trimming;
    /// numbers always count as an answer.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Coerce into the stored string form for a question of the given type.
    ///
    /// Numbers are stringified, with integral values rendered without a
    /// fractional part. Rating answers given as text are trimmed so that they
    /// parse as integers later; other text is kept verbatim.
    pub fn coerce(self, question_type: QuestionType) -> String {
        match self {
            Self::Text(text) if question_type == QuestionType::Rating => text.trim().to_string(),
            Self::Text(text) => text,
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", n as i64),
            Self::Number(n) => n.to_string(),
        }
    }
}
