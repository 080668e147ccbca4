#[macro_use]
mod common;

use actix_web::{http::StatusCode, test};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::{
    bearer, create_staff, create_user, drain_jobs, location, obtain_tokens, session_for, state,
};
use noticeboard::auth::{RegisterResponse, SESSION_COOKIE};
use noticeboard::events::record_event;
use noticeboard::models::{Book, BookInput, TokenUsage};
use noticeboard::tasks::Job;

#[actix_rt::test]
async fn test_register_issues_tokens_and_queues_mail() {
    let mut state = state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/register/")
        .set_json(json!({
            "username": "newcomer",
            "email": "newcomer@example.com",
            "password": "longenough1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let cookie_value = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .expect("session cookie set");
    let body: RegisterResponse = test::read_body_json(resp).await;
    assert_eq!(cookie_value, body.token);
    assert!(!body.refresh.is_empty());

    let usage = TokenUsage::list(&state.pool, Some(body.user_id)).await.unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].user, "newcomer");

    let jobs = drain_jobs(&mut state.job_receiver);
    assert_eq!(
        jobs,
        vec![
            Job::RegistrationEmail { user_id: body.user_id },
            Job::AdvertisementEmail { user_id: body.user_id },
        ]
    );

    let req = test::TestRequest::get()
        .uri("/api/books/")
        .append_header(bearer(&body.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let state = state().await;
    let app = test_app!(state);
    create_user(&state.pool, "taken", "takenpass").await;

    let req = test::TestRequest::post()
        .uri("/api/register/")
        .set_json(json!({
            "username": "taken",
            "email": "other@example.com",
            "password": "longenough1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/register/")
        .set_json(json!({
            "username": "has space",
            "email": "not-an-email",
            "password": "short"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_rt::test]
async fn test_obtain_and_refresh_tokens() {
    let state = state().await;
    let app = test_app!(state);
    create_user(&state.pool, "member", "memberpass").await;

    let req = test::TestRequest::post()
        .uri("/api/token/")
        .set_json(json!({ "username": "member", "password": "wrongpass" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let tokens = obtain_tokens(&app, "member", "memberpass").await;

    let req = test::TestRequest::post()
        .uri("/api/token/refresh/")
        .set_json(json!({ "refresh": tokens.refresh }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let access = body["access"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/books/")
        .append_header(bearer(&access))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/token/refresh/")
        .set_json(json!({ "refresh": tokens.access }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/books/")
        .append_header(bearer(&tokens.refresh))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_admin_token_records() {
    let state = state().await;
    let app = test_app!(state);
    let member = create_user(&state.pool, "member", "memberpass").await;
    let admin = create_staff(&state.pool, "admin", "adminpass").await;

    obtain_tokens(&app, "member", "memberpass").await;
    obtain_tokens(&app, "member", "memberpass").await;
    let admin_tokens = obtain_tokens(&app, "admin", "adminpass").await;
    let member_tokens = obtain_tokens(&app, "member", "memberpass").await;

    let get = |uri: String, token: &str| {
        test::TestRequest::get()
            .uri(&uri)
            .append_header(bearer(token))
            .to_request()
    };

    let resp = test::call_service(&app, get("/api/admin/tokens/".into(), &member_tokens.access)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(&app, get("/api/admin/tokens/".into(), &admin_tokens.access)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let all: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(all.len(), 4);

    let resp = test::call_service(
        &app,
        get(format!("/api/admin/tokens/?user_id={}", member.id), &admin_tokens.access),
    )
    .await;
    let filtered: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(filtered.len(), 3);
    assert!(filtered.iter().all(|t| t["user"] == "member"));

    let resp = test::call_service(
        &app,
        get(format!("/api/admin/tokens/{}/", admin.id), &admin_tokens.access),
    )
    .await;
    let own: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(own.len(), 1);
    assert_eq!(own[0]["user"], "admin");

    let delete = |uri: String| {
        test::TestRequest::delete()
            .uri(&uri)
            .append_header(bearer(&admin_tokens.access))
            .to_request()
    };

    let resp = test::call_service(&app, delete("/api/admin/tokens/delete/abc/".into())).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid token ID");

    let resp = test::call_service(&app, delete("/api/admin/tokens/delete/9999/".into())).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let id = filtered[0]["id"].as_i64().unwrap();
    let resp = test::call_service(&app, delete(format!("/api/admin/tokens/delete/{}/", id))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let remaining = TokenUsage::list(&state.pool, Some(member.id)).await.unwrap();
    assert_eq!(remaining.len(), 2);
}

#[actix_rt::test]
async fn test_delete_user_marks_their_edits() {
    let state = state().await;
    let app = test_app!(state);
    let author = create_user(&state.pool, "author", "authorpass").await;
    let editor = create_staff(&state.pool, "editor", "editorpass").await;
    create_staff(&state.pool, "admin", "adminpass").await;

    let input = BookInput {
        title: "Kept".into(),
        author: "Someone".into(),
        genre: "Essay".into(),
        publication_year: 2005,
    };
    let book = Book::create(&state.pool, &input, author.id).await.unwrap();

    let editor_tokens = obtain_tokens(&app, "editor", "editorpass").await;
    let req = test::TestRequest::patch()
        .uri(&format!("/api/books/{}/", book.id))
        .append_header(bearer(&editor_tokens.access))
        .set_json(json!({ "title": "Kept and edited" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let admin_tokens = obtain_tokens(&app, "admin", "adminpass").await;
    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}/delete/", editor.id))
        .append_header(bearer(&admin_tokens.access))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let book = Book::find(&state.pool, book.id).await.unwrap();
    assert_eq!(book.updated_by.as_deref(), Some("editor (deleted)"));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}/delete/", editor.id))
        .append_header(bearer(&admin_tokens.access))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_tokens_of_deleted_user_are_rejected() {
    let state = state().await;
    let app = test_app!(state);
    let leaver = create_user(&state.pool, "leaver", "leaverpass").await;
    create_staff(&state.pool, "admin", "adminpass").await;
    let leaver_tokens = obtain_tokens(&app, "leaver", "leaverpass").await;
    let admin_tokens = obtain_tokens(&app, "admin", "adminpass").await;
    let cookie = session_for(&state.keys, &leaver);

    let req = test::TestRequest::get()
        .uri(&format!("/board/profile/{}/edit/", leaver.id))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}/delete/", leaver.id))
        .append_header(bearer(&admin_tokens.access))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::post()
        .uri("/api/books/")
        .append_header(bearer(&leaver_tokens.access))
        .set_json(json!({
            "title": "Orphan",
            "author": "Nobody",
            "genre": "Essay",
            "publication_year": 2020
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
    assert!(Book::list(&state.pool, &Default::default()).await.unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri(&format!("/board/profile/{}/edit/", leaver.id))
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/board/login/");
}

#[actix_rt::test]
async fn test_published_events_are_recorded() {
    let mut state = state().await;
    let app = test_app!(state);
    create_user(&state.pool, "member", "memberpass").await;
    create_staff(&state.pool, "admin", "adminpass").await;
    let member_tokens = obtain_tokens(&app, "member", "memberpass").await;
    let admin_tokens = obtain_tokens(&app, "admin", "adminpass").await;

    let event = json!({
        "key": "author_created",
        "payload": { "author_id": 7, "author_name": "Ivan Franko" }
    });

    let req = test::TestRequest::post()
        .uri("/api/events/")
        .append_header(bearer(&member_tokens.access))
        .set_json(&event)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/events/")
        .append_header(bearer(&admin_tokens.access))
        .set_json(json!({ "key": "  " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/events/")
        .append_header(bearer(&admin_tokens.access))
        .set_json(&event)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "status": "accepted", "key": "author_created" }));

    let published = state.event_receiver.try_recv().expect("event published");
    let action = record_event(&state.pool, &published)
        .await
        .unwrap()
        .expect("known key stored");
    assert_eq!(action.author_name.as_deref(), Some("Ivan Franko"));

    let req = test::TestRequest::get()
        .uri("/api/admin/actions/")
        .append_header(bearer(&admin_tokens.access))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let actions: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["action"], "author_created");
    assert_eq!(actions[0]["author_id"], 7);
}

#[actix_rt::test]
async fn test_statistics_json() {
    let state = state().await;
    let app = test_app!(state);
    create_staff(&state.pool, "admin", "adminpass").await;
    let admin_tokens = obtain_tokens(&app, "admin", "adminpass").await;

    let req = test::TestRequest::get()
        .uri("/api/admin/statistics/")
        .append_header(bearer(&admin_tokens.access))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let stats: Value = test::read_body_json(resp).await;
    assert_eq!(stats["active_ads"], 0);
    assert_eq!(stats["comments_count"], 0);
    assert!(stats["category_stats"].as_array().unwrap().is_empty());
}
