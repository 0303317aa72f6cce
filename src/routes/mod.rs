//! Read-only JSON status endpoints for operators. No game intents are accepted here.

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::error::RegistryError;
use crate::state::AppState;

/// HTTP handler for the index page
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Realtime chess server")
}

pub async fn list_matches(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.registry.list_matches())
}

pub async fn get_match(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    match state.registry.get_match(&id) {
        Some(snapshot) => HttpResponse::Ok().json(snapshot),
        None => HttpResponse::NotFound()
            .json(json!({ "error": RegistryError::MatchNotFound(id).to_string() })),
    }
}

pub async fn queue_info(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.queue.info())
}

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/matches").route(web::get().to(list_matches)))
        .service(web::resource("/matches/{id}").route(web::get().to(get_match)))
        .service(web::resource("/queue").route(web::get().to(queue_info)));
}
