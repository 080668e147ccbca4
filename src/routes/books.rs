use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    events::{AuthorBookEvent, EventBus},
    models::{ActionKind, ActionPayload, Book, BookInput, BookPatch, BookQuery, User},
};
use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder};
use sqlx::SqlitePool;
use validator::Validate;

fn book_event(kind: ActionKind, book: &Book) -> AuthorBookEvent {
    AuthorBookEvent::new(
        kind,
        ActionPayload {
            author_id: None,
            author_name: Some(book.author.clone()),
            book_id: Some(book.id),
            book_title: Some(book.title.clone()),
        },
    )
}

/// Only the user who added a book, or staff, may change it.
async fn ensure_can_edit(
    pool: &SqlitePool,
    book: &Book,
    caller: &AuthenticatedUser,
) -> Result<(), AppError> {
    if book.user_id == caller.id {
        return Ok(());
    }
    User::require_staff(pool, caller.id).await.map(|_| ())
}

/// Lists books.
///
/// ## Query Parameters:
/// - `author`, `genre`, `publication_year` (optional): exact matches.
/// - `search` (optional): case-insensitive substring of the title.
/// - `ordering` (optional): `title`, `-title`, `publication_year` or
///   `-publication_year`. Anything else keeps insertion order.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Book` objects.
/// - `401 Unauthorized`: missing or invalid access token.
#[get("/books/")]
pub async fn list_books(
    pool: web::Data<SqlitePool>,
    _user: AuthenticatedUser,
    query_params: web::Query<BookQuery>,
) -> Result<impl Responder, AppError> {
    let books = Book::list(&pool, &query_params).await?;
    Ok(HttpResponse::Ok().json(books))
}

/// Adds a book owned by the caller.
///
/// ## Responses:
/// - `201 Created`: the new `Book`.
/// - `422 Unprocessable Entity`: a field failed validation.
#[post("/books/")]
pub async fn create_book(
    pool: web::Data<SqlitePool>,
    events: web::Data<EventBus>,
    user: AuthenticatedUser,
    book_data: web::Json<BookInput>,
) -> Result<impl Responder, AppError> {
    book_data.validate()?;

    let book = Book::create(&pool, &book_data, user.id).await?;
    events.publish(book_event(ActionKind::BookCreated, &book));

    Ok(HttpResponse::Created().json(book))
}

#[get("/books/{id}/")]
pub async fn get_book(
    pool: web::Data<SqlitePool>,
    _user: AuthenticatedUser,
    book_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let book = Book::find(&pool, book_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(book))
}

async fn save_update(
    pool: &SqlitePool,
    events: &EventBus,
    caller: &AuthenticatedUser,
    book_id: i64,
    changes: impl FnOnce(&Book) -> BookInput,
) -> Result<Book, AppError> {
    let book = Book::find(pool, book_id).await?;
    ensure_can_edit(pool, &book, caller).await?;

    let input = changes(&book);
    input.validate()?;
    let updated = Book::update(pool, book_id, &input, &caller.username).await?;
    events.publish(book_event(ActionKind::BookUpdated, &updated));
    Ok(updated)
}

/// Replaces a book. Owner or staff only; records the caller in `updated_by`.
#[put("/books/{id}/")]
pub async fn update_book(
    pool: web::Data<SqlitePool>,
    events: web::Data<EventBus>,
    user: AuthenticatedUser,
    book_id: web::Path<i64>,
    book_data: web::Json<BookInput>,
) -> Result<impl Responder, AppError> {
    let input = book_data.into_inner();
    let book = save_update(&pool, &events, &user, book_id.into_inner(), move |_| input).await?;
    Ok(HttpResponse::Ok().json(book))
}

/// Partially updates a book. Same rules as `PUT`.
#[patch("/books/{id}/")]
pub async fn patch_book(
    pool: web::Data<SqlitePool>,
    events: web::Data<EventBus>,
    user: AuthenticatedUser,
    book_id: web::Path<i64>,
    book_data: web::Json<BookPatch>,
) -> Result<impl Responder, AppError> {
    let patch = book_data.into_inner();
    patch.validate()?;
    let book = save_update(&pool, &events, &user, book_id.into_inner(), move |current| {
        patch.merge(current)
    })
    .await?;
    Ok(HttpResponse::Ok().json(book))
}

async fn remove_book(
    pool: &SqlitePool,
    caller: &AuthenticatedUser,
    book_id: i64,
) -> Result<HttpResponse, AppError> {
    let staff = User::require_staff(pool, caller.id).await?;
    Book::delete(pool, book_id).await?;
    log::info!("book {} deleted by {}", book_id, staff.username);
    Ok(HttpResponse::NoContent().finish())
}

/// Deletes a book. Staff only.
///
/// ## Responses:
/// - `204 No Content`: deleted.
/// - `403 Forbidden`: the caller is not staff.
/// - `404 Not Found`: no such book.
#[delete("/books/{id}/")]
pub async fn delete_book(
    pool: web::Data<SqlitePool>,
    user: AuthenticatedUser,
    book_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    remove_book(&pool, &user, book_id.into_inner()).await
}

/// Same as `DELETE /api/books/{id}/`, under the admin-style path.
#[delete("/books/{id}/delete/")]
pub async fn delete_book_admin(
    pool: web::Data<SqlitePool>,
    user: AuthenticatedUser,
    book_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    remove_book(&pool, &user, book_id.into_inner()).await
}
