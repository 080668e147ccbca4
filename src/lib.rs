#![doc = "The `noticeboard` library crate."]
#![doc = ""]
#![doc = "Domain models, authentication, routing, HTML rendering, background jobs and"]
#![doc = "event consumption for the noticeboard site: a classifieds board, a library"]
#![doc = "book API and a handful of company pages. The binary (`main.rs`) wires these"]
#![doc = "together into an actix-web server."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod search;
pub mod tasks;
pub mod templates;

// The app factory stays in main.rs (and is repeated in tests) because a
// factory returning `App<impl ServiceFactory<..>>` from the library does not
// satisfy the HttpServiceFactory bounds.

pub use crate::error::AppError;
