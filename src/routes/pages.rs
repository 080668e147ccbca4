use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use crate::templates::{ok, pages as html, redirect};

#[derive(Debug, Default, Deserialize)]
pub struct ServiceQuery {
    pub q: Option<String>,
    pub show_all: Option<String>,
}

#[get("/")]
pub async fn index() -> HttpResponse {
    redirect("/home/")
}

#[get("/")]
pub async fn home() -> HttpResponse {
    ok(html::home())
}

#[get("/about/")]
pub async fn about() -> HttpResponse {
    ok(html::about())
}

#[get("/contact/")]
pub async fn contact() -> HttpResponse {
    ok(html::contact())
}

/// The service catalogue. `q` filters titles; only `show_all=true` lifts the
/// limit of three entries.
#[get("/services/")]
pub async fn services(query: web::Query<ServiceQuery>) -> HttpResponse {
    let term = query.q.as_deref().unwrap_or("").trim();
    let show_all = query.show_all.as_deref() == Some("true");
    let listing = html::filter_services(term, show_all);
    ok(html::services(term, show_all, &listing))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(index).service(
        web::scope("/home")
            .service(home)
            .service(about)
            .service(contact)
            .service(services),
    );
}
