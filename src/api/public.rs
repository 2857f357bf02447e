use log::warn;
use mongodb::{bson::doc, Database};
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            form::{FormMessage, PublicForm},
            health::{DatabaseStatus, Health},
        },
        db::form::Form,
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![public_form, health]
}

/// A form as a respondent sees it. Only active forms are shown.
#[get("/public/form/<form_id>")]
async fn public_form(form_id: Id, forms: Coll<Form>) -> Result<Json<FormMessage<PublicForm>>> {
    let form = Form::find(&forms, form_id).await?;
    if !form.is_active {
        return Err(Error::Forbidden("This form is not active".to_string()));
    }
    Ok(Json(FormMessage::new(
        "Form retrieved successfully",
        form.into(),
    )))
}

#[get("/health")]
async fn health(db: &State<Database>) -> Json<Health> {
    let database = match db.run_command(doc! { "ping": 1 }, None).await {
        Ok(_) => DatabaseStatus::Connected,
        Err(e) => {
            warn!("Database ping failed: {e}");
            DatabaseStatus::Disconnected
        }
    };
    Json(Health::new(database))
}
