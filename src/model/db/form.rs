use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use log::info;
use mongodb::{
    bson::{self, doc, serde_helpers::chrono_datetime_as_bson_datetime},
    options::FindOptions,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::form::FormPatch,
    common::{question::DEFAULT_RATING_SCALE, QuestionType},
    db::response::Response,
    mongodb::{Coll, Id},
};

/// A single question, embedded in its form. Questions have no lifecycle of
/// their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique within the form.
    pub id: Id,
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub required: bool,
    /// Only meaningful for multiple choice questions.
    #[serde(default)]
    pub options: Vec<String>,
    /// Only meaningful for text questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Only meaningful for rating questions.
    #[serde(default = "default_max_rating")]
    pub max_rating: u8,
}

fn default_max_rating() -> u8 {
    DEFAULT_RATING_SCALE
}

/// Core form data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormCore {
    pub title: String,
    pub description: String,
    /// Questions in display and collection order.
    pub questions: Vec<Question>,
    /// Foreign Key user ID of the only user allowed to change the form.
    pub owner_id: Id,
    /// Whether the form accepts submissions.
    pub is_active: bool,
    /// Number of stored responses. Only ever changed by atomic `$inc`
    /// updates, or overwritten by a recount.
    pub response_count: u64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl FormCore {
    /// Create a new, active form with no responses.
    pub fn new(owner_id: Id, title: String, description: String, questions: Vec<Question>) -> Self {
        let now = Utc::now();
        Self {
            title,
            description,
            questions,
            owner_id,
            is_active: true,
            response_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get the question with the given ID.
    pub fn question(&self, question_id: Id) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Fail with `Forbidden` unless the given user owns this form.
    pub fn ensure_owned_by(&self, user_id: Id) -> Result<()> {
        if self.owner_id == user_id {
            Ok(())
        } else {
            Err(Error::access_denied())
        }
    }
}

/// A form without an ID.
pub type NewForm = FormCore;

/// A form from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub form: FormCore,
}

impl Form {
    /// Fetch a form, failing with `NotFound` if it doesn't exist.
    pub async fn find(forms: &Coll<Form>, form_id: Id) -> Result<Form> {
        forms
            .find_one(form_id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found("Form"))
    }

    /// Fetch a form on behalf of a user, failing with `Forbidden` if they don't own it.
    pub async fn find_owned(forms: &Coll<Form>, form_id: Id, user_id: Id) -> Result<Form> {
        let form = Self::find(forms, form_id).await?;
        form.ensure_owned_by(user_id)?;
        Ok(form)
    }

    /// All forms owned by the given user, newest first.
    pub async fn for_owner(forms: &Coll<Form>, owner_id: Id) -> Result<Vec<Form>> {
        let filter = doc! {
            "owner_id": owner_id,
        };
        let newest_first = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .build();
        Ok(forms.find(filter, newest_first).await?.try_collect().await?)
    }

    /// Apply an owner's patch. Only the owner may change a form, and the
    /// response counter and owner are never patched.
    pub fn update(&mut self, user_id: Id, patch: FormPatch) -> Result<()> {
        self.ensure_owned_by(user_id)?;
        let patch = patch.validate()?;

        if let Some(title) = patch.title {
            self.form.title = title;
        }
        if let Some(description) = patch.description {
            self.form.description = description;
        }
        if let Some(questions) = patch.questions {
            self.form.questions = questions;
        }
        if let Some(is_active) = patch.is_active {
            self.form.is_active = is_active;
        }
        self.form.updated_at = Utc::now();
        Ok(())
    }

    /// Persist the owner-editable fields. Only those fields are written, so a
    /// concurrent counter update is never overwritten.
    pub async fn save_changes(&self, forms: &Coll<Form>) -> Result<()> {
        let update = doc! {
            "$set": {
                "title": self.title.as_str(),
                "description": self.description.as_str(),
                "questions": bson::to_bson(&self.questions)?,
                "is_active": self.is_active,
                "updated_at": bson::DateTime::from_chrono(self.updated_at),
            }
        };
        let result = forms.update_one(self.id.as_doc(), update, None).await?;
        if result.matched_count == 0 {
            return Err(Error::not_found("Form"));
        }
        Ok(())
    }

    /// Delete this form and all of its responses.
    ///
    /// Responses go first, so no response is ever left pointing at a missing
    /// form. Returns the number of responses removed.
    pub async fn delete_cascade(
        self,
        forms: &Coll<Form>,
        responses: &Coll<Response>,
    ) -> Result<u64> {
        let filter = doc! {
            "form_id": self.id,
        };
        let removed = responses.delete_many(filter, None).await?.deleted_count;
        forms.delete_one(self.id.as_doc(), None).await?;
        info!("Deleted form {} and {removed} responses", self.id);
        Ok(removed)
    }
}

impl Deref for Form {
    type Target = FormCore;

    fn deref(&self) -> &Self::Target {
        &self.form
    }
}

impl DerefMut for Form {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.form
    }
}
