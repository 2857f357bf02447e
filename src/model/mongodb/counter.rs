use mongodb::bson::doc;

use crate::error::Result;
use crate::model::mongodb::{Coll, Id, MongoCollection};

/// Atomically add `delta` to an integer field of the document with the given ID.
///
/// This is a single `$inc` update, so concurrent callers never lose updates.
/// A negative `delta` only applies if the field would stay non-negative.
/// Returns whether a document was updated.
pub async fn increment<T>(coll: &Coll<T>, id: Id, field: &str, delta: i64) -> Result<bool>
where
    T: MongoCollection,
{
    let mut filter = id.as_doc();
    if delta < 0 {
        filter.insert(field, doc! { "$gte": -delta });
    }
    let update = doc! {
        "$inc": { field: delta }
    };
    let result = coll.update_one(filter, update, None).await?;
    Ok(result.modified_count == 1)
}

/// Overwrite an integer field of the document with the given ID, e.g. after a recount.
/// Returns whether the document exists.
pub async fn reset<T>(coll: &Coll<T>, id: Id, field: &str, value: i64) -> Result<bool>
where
    T: MongoCollection,
{
    let update = doc! {
        "$set": { field: value }
    };
    let result = coll.update_one(id.as_doc(), update, None).await?;
    Ok(result.matched_count == 1)
}
