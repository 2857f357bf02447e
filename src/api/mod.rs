use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::model::api::Message;

mod auth;
mod forms;
mod public;
mod responses;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(forms::routes());
    routes.extend(responses::routes());
    routes.extend(public::routes());
    routes
}

/// Every error status gets a JSON `{message}` body, matching error replies
/// from the handlers themselves.
pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal_error,
        fallback
    ]
}

#[catch(400)]
fn bad_request() -> Json<Message> {
    Json(Message::new("Bad request"))
}

#[catch(401)]
fn unauthorized() -> Json<Message> {
    Json(Message::new("Authentication required"))
}

#[catch(403)]
fn forbidden() -> Json<Message> {
    Json(Message::new("Access denied"))
}

#[catch(404)]
fn not_found() -> Json<Message> {
    Json(Message::new("API endpoint not found"))
}

#[catch(422)]
fn unprocessable(req: &Request<'_>) -> Json<Message> {
    Json(Message::new(format!("Malformed request to {}", req.uri().path())))
}

#[catch(500)]
fn internal_error() -> Json<Message> {
    Json(Message::new("Internal server error"))
}

#[catch(default)]
fn fallback(status: Status, _req: &Request<'_>) -> Json<Message> {
    Json(Message::new(status.reason_lossy()))
}
