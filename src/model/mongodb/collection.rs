use std::ops::Deref;

use log::{debug, error};
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};

use crate::model::db::{form::Form, response::Response, user::User};

/// A type that can be directly inserted/read to/from the database.
/// Documents carry their own `_id`, generated before insertion.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.rocket().state::<Database>() {
            Some(db) => request::Outcome::Success(Coll::from_db(db)),
            None => {
                error!("Database is not in managed state");
                request::Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}

// User collections
const USERS: &str = "users";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}

// Form collections
const FORMS: &str = "forms";
impl MongoCollection for Form {
    const NAME: &'static str = FORMS;
}

// Response collections
const RESPONSES: &str = "responses";
impl MongoCollection for Response {
    const NAME: &'static str = RESPONSES;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // User collection: usernames and emails identify accounts.
    for key in ["username", "email"] {
        let user_index = IndexModel::builder()
            .keys(doc! { key: 1 })
            .options(unique.clone())
            .build();
        Coll::<User>::from_db(db)
            .create_index(user_index, None)
            .await?;
    }

    // Form collection: dashboards list forms by owner.
    let form_index = IndexModel::builder()
        .keys(doc! { "owner_id": 1, "created_at": -1 })
        .build();
    Coll::<Form>::from_db(db)
        .create_index(form_index, None)
        .await?;

    // Response collection: responses are always looked up by form.
    let response_index = IndexModel::builder()
        .keys(doc! { "form_id": 1, "submitted_at": 1 })
        .build();
    Coll::<Response>::from_db(db)
        .create_index(response_index, None)
        .await?;

    Ok(())
}
