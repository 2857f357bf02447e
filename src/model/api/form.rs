use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    common::{
        question::{DEFAULT_RATING_SCALE, MAX_RATING_SCALE, MIN_RATING_SCALE},
        QuestionType,
    },
    db::form::{Form, NewForm, Question},
    mongodb::Id,
};

pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
pub const MAX_QUESTION_LENGTH: usize = 500;

/// A question as sent by a form builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSpec {
    /// Present when editing an existing question, so that stored answers keep
    /// pointing at it. New questions get a fresh ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ApiId>,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub max_rating: Option<i64>,
}

impl QuestionSpec {
    /// Validate and normalise this spec into a stored question.
    pub fn into_question(self) -> Result<Question> {
        let question_text = self.question_text.trim().to_string();
        if question_text.is_empty() {
            return Err(Error::InvalidInput("Question text is required".to_string()));
        }
        if question_text.chars().count() > MAX_QUESTION_LENGTH {
            return Err(Error::InvalidInput(format!(
                "Question text must be at most {MAX_QUESTION_LENGTH} characters"
            )));
        }

        let max_rating = match self.max_rating {
            None => DEFAULT_RATING_SCALE,
            Some(n) => u8::try_from(n)
                .ok()
                .filter(|n| (MIN_RATING_SCALE..=MAX_RATING_SCALE).contains(n))
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "maxRating must be between {MIN_RATING_SCALE} and {MAX_RATING_SCALE}"
                    ))
                })?,
        };

        let options = self
            .options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let placeholder = self
            .placeholder
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(Question {
            id: self.id.map(Id::from).unwrap_or_default(),
            question_text,
            question_type: self.question_type,
            required: self.required,
            options,
            placeholder,
            max_rating,
        })
    }
}

impl From<Question> for QuestionSpec {
    fn from(question: Question) -> Self {
        Self {
            id: Some(question.id.into()),
            question_text: question.question_text,
            question_type: question.question_type,
            required: question.required,
            options: question.options,
            placeholder: question.placeholder,
            max_rating: Some(question.max_rating.into()),
        }
    }
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(Error::InvalidInput(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_description(description: &str) -> Result<String> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(Error::InvalidInput(format!(
            "Description must be at most {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(description.to_string())
}

fn validate_questions(specs: Vec<QuestionSpec>) -> Result<Vec<Question>> {
    let questions = specs
        .into_iter()
        .map(QuestionSpec::into_question)
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    if !questions.iter().all(|q| seen.insert(q.id)) {
        return Err(Error::InvalidInput("Duplicate question id".to_string()));
    }
    Ok(questions)
}

/// A form specification, as sent to create a form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSpec {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<QuestionSpec>,
}

impl FormSpec {
    /// Validate this spec into a new form owned by the given user.
    pub fn into_form(self, owner_id: Id) -> Result<NewForm> {
        let title = validate_title(&self.title)?;
        let description = validate_description(&self.description)?;
        let questions = validate_questions(self.questions)?;
        Ok(NewForm::new(owner_id, title, description, questions))
    }
}

/// A partial update to a form. Absent fields are left unchanged; anything
/// else in the request body (e.g. `responseCount`) is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Option<Vec<QuestionSpec>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// A [`FormPatch`] that has passed validation.
#[derive(Debug)]
pub struct ValidFormPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub questions: Option<Vec<Question>>,
    pub is_active: Option<bool>,
}

impl FormPatch {
    /// Apply the same rules as form creation to every field present.
    pub fn validate(self) -> Result<ValidFormPatch> {
        Ok(ValidFormPatch {
            title: self.title.as_deref().map(validate_title).transpose()?,
            description: self
                .description
                .as_deref()
                .map(validate_description)
                .transpose()?,
            questions: self.questions.map(validate_questions).transpose()?,
            is_active: self.is_active,
        })
    }
}

/// A question as shown to anyone who can see the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDescription {
    pub id: ApiId,
    pub question_text: String,
    pub question_type: QuestionType,
    pub required: bool,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub max_rating: u8,
}

impl From<Question> for QuestionDescription {
    fn from(question: Question) -> Self {
        Self {
            id: question.id.into(),
            question_text: question.question_text,
            question_type: question.question_type,
            required: question.required,
            options: question.options,
            placeholder: question.placeholder,
            max_rating: question.max_rating,
        }
    }
}

/// The owner's view of a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDescription {
    pub id: ApiId,
    pub title: String,
    pub description: String,
    pub questions: Vec<QuestionDescription>,
    pub owner_id: ApiId,
    pub is_active: bool,
    pub response_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Form> for FormDescription {
    fn from(form: Form) -> Self {
        Self {
            id: form.id.into(),
            title: form.form.title,
            description: form.form.description,
            questions: form.form.questions.into_iter().map(Into::into).collect(),
            owner_id: form.form.owner_id.into(),
            is_active: form.form.is_active,
            response_count: form.form.response_count,
            created_at: form.form.created_at,
            updated_at: form.form.updated_at,
        }
    }
}

/// The public view of a form: what a respondent needs, and nothing about its
/// owner or bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicForm {
    pub id: ApiId,
    pub title: String,
    pub description: String,
    pub questions: Vec<QuestionDescription>,
    pub created_at: DateTime<Utc>,
}

impl From<Form> for PublicForm {
    fn from(form: Form) -> Self {
        Self {
            id: form.id.into(),
            title: form.form.title,
            description: form.form.description,
            questions: form.form.questions.into_iter().map(Into::into).collect(),
            created_at: form.form.created_at,
        }
    }
}

/// A form view together with a human-readable message.
#[derive(Debug, Serialize, Deserialize)]
pub struct FormMessage<F> {
    pub message: String,
    pub form: F,
}

impl<F> FormMessage<F> {
    pub fn new(message: impl Into<String>, form: F) -> Self {
        Self {
            message: message.into(),
            form,
        }
    }
}
