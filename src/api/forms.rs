use log::{info, warn};
use rocket::{
    http::Status,
    serde::json::{self, Json},
    Responder, Route,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            form::{FormDescription, FormMessage, FormPatch, FormSpec, PublicForm},
            Message,
        },
        db::{form::Form, response::Response},
        mongodb::{counter, Coll, Id},
        stats::{FormAnalytics, UserStats},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        create_form,
        user_forms,
        user_stats,
        get_form,
        update_form,
        delete_form,
        form_analytics,
        recount_responses,
    ]
}

/// The same form, rendered for whoever is asking.
#[derive(Responder)]
pub enum FormView {
    Owner(Json<FormDescription>),
    Public(Json<PublicForm>),
}

#[post("/forms/create", data = "<spec>", format = "json")]
async fn create_form(
    token: AuthToken,
    spec: std::result::Result<Json<FormSpec>, json::Error<'_>>,
    forms: Coll<Form>,
) -> Result<(Status, Json<FormMessage<FormDescription>>)> {
    let spec = spec.map_err(|e| {
        Error::InvalidInput(format!("Title and questions are required ({e})"))
    })?;
    let form = Form {
        id: Id::new(),
        form: spec.into_inner().into_form(token.id())?,
    };
    forms.insert_one(&form, None).await?;
    info!("User {} created form {}", token.id(), form.id);

    Ok((
        Status::Created,
        Json(FormMessage::new("Form created successfully", form.into())),
    ))
}

#[get("/forms/user/<user_id>")]
async fn user_forms(
    token: AuthToken,
    user_id: Id,
    forms: Coll<Form>,
) -> Result<Json<Vec<FormDescription>>> {
    if user_id != token.id() {
        return Err(Error::access_denied());
    }
    let owned = Form::for_owner(&forms, user_id).await?;
    Ok(Json(owned.into_iter().map(Into::into).collect()))
}

#[get("/forms/user/<user_id>/stats")]
async fn user_stats(token: AuthToken, user_id: Id, forms: Coll<Form>) -> Result<Json<UserStats>> {
    if user_id != token.id() {
        return Err(Error::access_denied());
    }
    Ok(Json(UserStats::for_owner(&forms, user_id).await?))
}

#[get("/forms/<form_id>")]
async fn get_form(
    token: Option<AuthToken>,
    form_id: Id,
    forms: Coll<Form>,
) -> Result<FormView> {
    let form = Form::find(&forms, form_id).await?;
    let is_owner = token.map_or(false, |t| form.owner_id == t.id());
    Ok(if is_owner {
        FormView::Owner(Json(form.into()))
    } else {
        FormView::Public(Json(form.into()))
    })
}

#[put("/forms/<form_id>", data = "<patch>", format = "json")]
async fn update_form(
    token: AuthToken,
    form_id: Id,
    patch: std::result::Result<Json<FormPatch>, json::Error<'_>>,
    forms: Coll<Form>,
) -> Result<Json<FormMessage<FormDescription>>> {
    let mut form = Form::find_owned(&forms, form_id, token.id()).await?;
    let patch = patch.map_err(|e| Error::InvalidInput(format!("Invalid form update ({e})")))?;
    form.update(token.id(), patch.into_inner())?;
    form.save_changes(&forms).await?;

    // Re-read so the reply shows the live response counter.
    let form = Form::find(&forms, form_id).await?;
    Ok(Json(FormMessage::new("Form updated successfully", form.into())))
}

#[delete("/forms/<form_id>")]
async fn delete_form(
    token: AuthToken,
    form_id: Id,
    forms: Coll<Form>,
    responses: Coll<Response>,
) -> Result<Json<Message>> {
    let form = Form::find_owned(&forms, form_id, token.id()).await?;
    form.delete_cascade(&forms, &responses).await?;
    Ok(Json(Message::new("Form deleted successfully")))
}

#[get("/forms/<form_id>/analytics", rank = 2)]
async fn form_analytics(
    token: AuthToken,
    form_id: Id,
    forms: Coll<Form>,
    responses: Coll<Response>,
) -> Result<Json<FormAnalytics>> {
    let form = Form::find_owned(&forms, form_id, token.id()).await?;
    let stored = Response::for_form(&responses, form_id).await?;
    Ok(Json(FormAnalytics::compute(
        &form,
        stored.iter().map(|r| &r.response),
    )))
}

#[post("/forms/<form_id>/recount")]
async fn recount_responses(
    token: AuthToken,
    form_id: Id,
    forms: Coll<Form>,
    responses: Coll<Response>,
) -> Result<Json<FormMessage<FormDescription>>> {
    let form = Form::find_owned(&forms, form_id, token.id()).await?;
    let actual = Response::count_for_form(&responses, form_id).await?;
    if actual != form.response_count {
        warn!(
            "Response counter for form {form_id} drifted: stored {}, actual {actual}",
            form.response_count
        );
    }
    let actual = i64::try_from(actual)
        .map_err(|_| Error::InvalidInput("Too many responses to count".to_string()))?;
    if !counter::reset(&forms, form_id, "response_count", actual).await? {
        return Err(Error::not_found("Form"));
    }

    let form = Form::find(&forms, form_id).await?;
    Ok(Json(FormMessage::new("Response count recalculated", form.into())))
}
