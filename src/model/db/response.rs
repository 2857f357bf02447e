use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime},
    options::FindOptions,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::QuestionType,
    mongodb::{Coll, Id},
};

/// One submitted answer. The question text and type are snapshots taken at
/// submission time, so the record stays readable after the form is edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// The question answered. Not guaranteed to still exist on the form.
    pub question_id: Id,
    pub question_text: String,
    pub question_type: QuestionType,
    pub answer: String,
}

/// Core response data, as stored in the database. Responses are never
/// modified after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCore {
    /// Foreign Key form ID.
    pub form_id: Id,
    /// Answers in the form's question order.
    pub answers: Vec<AnswerRecord>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub submitted_at: DateTime<Utc>,
}

impl ResponseCore {
    /// Create a response submitted now.
    pub fn new(form_id: Id, answers: Vec<AnswerRecord>) -> Self {
        Self {
            form_id,
            answers,
            submitted_at: Utc::now(),
        }
    }

    /// The answer given to the given question, if any.
    pub fn answer_to(&self, question_id: Id) -> Option<&AnswerRecord> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }
}

/// A response without an ID.
pub type NewResponse = ResponseCore;

/// A response from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub response: ResponseCore,
}

impl Response {
    /// Fetch a response, failing with `NotFound` if it doesn't exist.
    pub async fn find(responses: &Coll<Response>, response_id: Id) -> Result<Response> {
        responses
            .find_one(response_id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found("Response"))
    }

    /// All responses to the given form, oldest first.
    pub async fn for_form(responses: &Coll<Response>, form_id: Id) -> Result<Vec<Response>> {
        let filter = doc! {
            "form_id": form_id,
        };
        let oldest_first = FindOptions::builder()
            .sort(doc! { "submitted_at": 1, "_id": 1 })
            .build();
        Ok(responses
            .find(filter, oldest_first)
            .await?
            .try_collect()
            .await?)
    }

    /// Number of stored responses to the given form.
    pub async fn count_for_form(responses: &Coll<Response>, form_id: Id) -> Result<u64> {
        let filter = doc! {
            "form_id": form_id,
        };
        Ok(responses.count_documents(filter, None).await?)
    }
}

impl Deref for Response {
    type Target = ResponseCore;

    fn deref(&self) -> &Self::Target {
        &self.response
    }
}
