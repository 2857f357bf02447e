use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::{AnswerValue, QuestionType},
    db::response::{AnswerRecord, Response},
};

/// A respondent's submission, as received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub answers: Vec<CandidateAnswer>,
}

/// One answer as received, before it is matched against the form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateAnswer {
    /// Kept as a raw string: an ID that doesn't parse simply matches no
    /// question.
    pub question_id: String,
    /// `None` if absent or `null`.
    #[serde(default)]
    pub answer: Option<AnswerValue>,
}

/// A stored answer, as shown to the form's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDescription {
    pub question_id: ApiId,
    pub question_text: String,
    pub question_type: QuestionType,
    pub answer: String,
}

impl From<AnswerRecord> for AnswerDescription {
    fn from(record: AnswerRecord) -> Self {
        Self {
            question_id: record.question_id.into(),
            question_text: record.question_text,
            question_type: record.question_type,
            answer: record.answer,
        }
    }
}

/// A stored response, as shown to the form's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDescription {
    pub id: ApiId,
    pub form_id: ApiId,
    pub answers: Vec<AnswerDescription>,
    pub submitted_at: DateTime<Utc>,
}

impl From<Response> for ResponseDescription {
    fn from(response: Response) -> Self {
        Self {
            id: response.id.into(),
            form_id: response.response.form_id.into(),
            answers: response
                .response
                .answers
                .into_iter()
                .map(Into::into)
                .collect(),
            submitted_at: response.response.submitted_at,
        }
    }
}
