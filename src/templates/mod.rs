//! Server-side HTML rendering.
//!
//! Pages are assembled from small string builders. Every value that comes from
//! a user or the database goes through [`escape`] before it reaches the markup.

pub mod board;
pub mod pages;

use std::fmt::Write;

use actix_web::http::header;
use actix_web::HttpResponse;
use chrono::{Datelike, Utc};

use crate::auth::AuthenticatedUser;

/// Escapes text for use in element content and quoted attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encodes a query-string value.
pub fn encode_query(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => {
                let _ = write!(out, "%{:02X}", b);
            }
        }
    }
    out
}

fn nav(user: Option<&AuthenticatedUser>) -> String {
    let mut nav = String::from(
        r#"<nav><a href="/home/">Home</a> <a href="/board/">Board</a> <a href="/board/statistics/">Statistics</a> "#,
    );
    match user {
        Some(user) => {
            let _ = write!(
                nav,
                r#"<a href="/board/profile/{id}/">{name}</a> <a href="/board/logout/">Log out</a>"#,
                id = user.id,
                name = escape(&user.username)
            );
        }
        None => nav.push_str(
            r#"<a href="/board/login/">Log in</a> <a href="/board/register/">Register</a>"#,
        ),
    }
    nav.push_str("</nav>");
    nav
}

/// Wraps `body` in the shared page shell.
pub fn layout(title: &str, user: Option<&AuthenticatedUser>, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n<header>{nav}</header>\n<main>\n<h1>{title}</h1>\n{body}\n</main>\n\
         <footer>&copy; {year}</footer>\n</body>\n</html>\n",
        title = escape(title),
        nav = nav(user),
        body = body,
        year = Utc::now().year(),
    )
}

/// Renders form messages as a list; empty input renders nothing.
pub fn error_list(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut html = String::from(r#"<ul class="errors">"#);
    for error in errors {
        let _ = write!(html, "<li>{}</li>", escape(error));
    }
    html.push_str("</ul>");
    html
}

/// A labelled `<input>`.
pub fn input(label: &str, name: &str, kind: &str, value: &str) -> String {
    format!(
        r#"<p><label for="{name}">{label}</label> <input id="{name}" name="{name}" type="{kind}" value="{value}"></p>"#,
        name = name,
        label = escape(label),
        kind = kind,
        value = escape(value),
    )
}

pub fn textarea(label: &str, name: &str, value: &str) -> String {
    format!(
        r#"<p><label for="{name}">{label}</label> <textarea id="{name}" name="{name}" rows="4">{value}</textarea></p>"#,
        name = name,
        label = escape(label),
        value = escape(value),
    )
}

/// A POST form around `fields` with a submit button.
pub fn form(action: &str, fields: &str, submit: &str) -> String {
    format!(
        r#"<form method="post" action="{action}">{fields}<button type="submit">{submit}</button></form>"#,
        action = escape(action),
        fields = fields,
        submit = escape(submit),
    )
}

pub fn html(status: actix_web::http::StatusCode, page: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(page)
}

pub fn ok(page: String) -> HttpResponse {
    html(actix_web::http::StatusCode::OK, page)
}

/// `302 Found` to `location`.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}
