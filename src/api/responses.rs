use log::{info, warn};
use rocket::{
    http::{ContentType, Header, Status},
    serde::json::{self, Json, Value},
    Responder, Route,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{auth::AuthToken, response::ResponseDescription, Message},
        db::{
            form::Form,
            response::{NewResponse, Response},
        },
        export::{self, ExportFormat},
        mongodb::{counter, Coll, Id},
        submission,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        submit_response,
        form_responses,
        get_response,
        delete_response,
        export_responses,
    ]
}

/// A downloadable export.
#[derive(Responder)]
pub enum Export {
    Json(Json<Vec<ResponseDescription>>),
    Csv(String, ContentType, Header<'static>),
}

#[post("/responses/<form_id>/submit", data = "<body>")]
async fn submit_response(
    form_id: Id,
    body: std::result::Result<Json<Value>, json::Error<'_>>,
    forms: Coll<Form>,
    responses: Coll<Response>,
) -> Result<(Status, Json<Message>)> {
    let form = Form::find(&forms, form_id).await?;
    let body = body.map(Json::into_inner).unwrap_or(Value::Null);
    let answers = submission::validate(&form, &body)?;

    let response = Response {
        id: Id::new(),
        response: NewResponse::new(form_id, answers),
    };
    responses.insert_one(&response, None).await?;

    // The response is already stored; a missing form here means it was
    // deleted concurrently.
    if !counter::increment(&forms, form_id, "response_count", 1).await? {
        warn!(
            "Response {} stored but form {form_id} was gone before its counter was updated",
            response.id
        );
    }
    info!("Response {} submitted to form {form_id}", response.id);

    Ok((
        Status::Created,
        Json(Message::new("Response submitted successfully")),
    ))
}

#[get("/responses/form/<form_id>")]
async fn form_responses(
    token: AuthToken,
    form_id: Id,
    forms: Coll<Form>,
    responses: Coll<Response>,
) -> Result<Json<Vec<ResponseDescription>>> {
    Form::find_owned(&forms, form_id, token.id()).await?;
    let stored = Response::for_form(&responses, form_id).await?;
    Ok(Json(stored.into_iter().map(Into::into).collect()))
}

/// Fetch a response on behalf of the owner of its form.
async fn find_owned_response(
    forms: &Coll<Form>,
    responses: &Coll<Response>,
    response_id: Id,
    user_id: Id,
) -> Result<Response> {
    let response = Response::find(responses, response_id).await?;
    match Form::find(forms, response.form_id).await {
        Ok(form) => form.ensure_owned_by(user_id)?,
        // An orphaned response belongs to nobody.
        Err(Error::NotFound(_)) => return Err(Error::not_found("Response")),
        Err(e) => return Err(e),
    }
    Ok(response)
}

#[get("/responses/<response_id>")]
async fn get_response(
    token: AuthToken,
    response_id: Id,
    forms: Coll<Form>,
    responses: Coll<Response>,
) -> Result<Json<ResponseDescription>> {
    let response = find_owned_response(&forms, &responses, response_id, token.id()).await?;
    Ok(Json(response.into()))
}

#[delete("/responses/<response_id>")]
async fn delete_response(
    token: AuthToken,
    response_id: Id,
    forms: Coll<Form>,
    responses: Coll<Response>,
) -> Result<Json<Message>> {
    let response = find_owned_response(&forms, &responses, response_id, token.id()).await?;

    let deleted = responses
        .delete_one(response.id.as_doc(), None)
        .await?
        .deleted_count;
    // Only the request that actually removed the response decrements.
    if deleted == 1 && !counter::increment(&forms, response.form_id, "response_count", -1).await? {
        warn!(
            "Response counter for form {} was already zero when deleting response {}",
            response.form_id, response.id
        );
    }

    Ok(Json(Message::new("Response deleted successfully")))
}

#[get("/responses/export/<form_id>?<format>")]
async fn export_responses(
    token: AuthToken,
    form_id: Id,
    format: Option<&str>,
    forms: Coll<Form>,
    responses: Coll<Response>,
) -> Result<Export> {
    let form = Form::find_owned(&forms, form_id, token.id()).await?;
    let format = format.map_or(Ok(ExportFormat::default()), str::parse)?;
    let stored = Response::for_form(&responses, form_id).await?;

    Ok(match format {
        ExportFormat::Json => Export::Json(Json(stored.into_iter().map(Into::into).collect())),
        ExportFormat::Csv => Export::Csv(
            export::to_csv(&form, &stored),
            ContentType::CSV,
            Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"responses-{form_id}.csv\""),
            ),
        ),
    })
}
