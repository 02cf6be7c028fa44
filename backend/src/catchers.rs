use rocket::{Request, catch, serde::json::Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorMessage {
    error: String,
    status: u16,
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorMessage> {
    Json(ErrorMessage {
        error: "Malformed request body.".into(),
        status: 400
    })
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Json<ErrorMessage> {
    Json(ErrorMessage {
        error: "The requested resource was not found.".into(),
        status: 404
    })
}

#[catch(422)]
pub fn unprocessable(req: &Request) -> Json<ErrorMessage> {
    let error_msg = match req.uri().path().segments().last() {
        Some("vote") => "Expected a vote title and a list of choices.",
        Some("choice") => "Expected a vote title, a choice title and an optional delta.",
        Some("result") => "Expected a vote title.",
        _ => "Request could not be processed."
    };

    Json(ErrorMessage {
        error: error_msg.into(),
        status: 422
    })
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorMessage> {
    Json(ErrorMessage {
        error: "An internal server error occurred.".into(),
        status: 500
    })
}
