use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// The kinds of question a form can ask.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    /// Free text, optionally with a placeholder hint.
    #[default]
    Text,
    /// One of a list of options.
    MultipleChoice,
    /// An integer score out of `max_rating`.
    Rating,
}

impl Display for QuestionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::MultipleChoice => "multipleChoice",
            Self::Rating => "rating",
        })
    }
}

impl From<QuestionType> for Bson {
    fn from(question_type: QuestionType) -> Self {
        to_bson(&question_type).expect("Serialisation is infallible")
    }
}

/// Bounds on a rating question's scale.
pub const MIN_RATING_SCALE: u8 = 2;
pub const MAX_RATING_SCALE: u8 = 10;
pub const DEFAULT_RATING_SCALE: u8 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json;

    #[test]
    fn wire_names_are_camel_case() {
        assert_eq!(
            serde_json::to_string(&QuestionType::MultipleChoice).unwrap(),
            "\"multipleChoice\""
        );
        let parsed: QuestionType = serde_json::from_str("\"rating\"").unwrap();
        assert_eq!(parsed, QuestionType::Rating);
        assert!(serde_json::from_str::<QuestionType>("\"checkbox\"").is_err());
        assert_eq!(QuestionType::MultipleChoice.to_string(), "multipleChoice");
    }
}
