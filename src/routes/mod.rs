pub mod admin;
pub mod auth;
pub mod board;
pub mod books;
pub mod events;
pub mod health;
pub mod pages;

use actix_web::web;

/// Library API routes, mounted under `/api` behind `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(auth::register)
        .service(auth::obtain_token)
        .service(auth::refresh_token)
        .service(books::list_books)
        .service(books::create_book)
        .service(books::get_book)
        .service(books::update_book)
        .service(books::patch_book)
        .service(books::delete_book)
        .service(books::delete_book_admin)
        .service(admin::delete_user)
        .service(admin::list_tokens)
        .service(admin::list_user_tokens)
        .service(admin::delete_token)
        .service(admin::statistics)
        .service(admin::list_actions)
        .service(events::publish_event);
}
