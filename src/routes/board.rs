//! The classifieds board: server-rendered pages under `/board`.
//!
//! The visitor is identified by the `token` cookie (see `SessionUser`).
//! Pages that need a login redirect anonymous visitors to the login form;
//! invalid forms are rendered again with their messages.

use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::{AuthenticatedUser, SessionUser, TokenKeys},
    error::AppError,
    models::{
        board::ADS_PER_PAGE,
        forms::{
            AdForm, AdListQuery, Cleaned, CommentForm, LoginForm, PasswordChangeForm, ProfileForm,
            RegistrationForm,
        },
        Ad, BoardStatistics, Category, Comment, NewAd, Profile, User,
    },
    pagination::Pagination,
    routes::auth::{enqueue_welcome_mail, removal_cookie, session_cookie},
    tasks::{Job, JobQueue},
    templates::{board as pages, ok, redirect},
};

const BOARD_URL: &str = "/board/";
const LOGIN_URL: &str = "/board/login/";

fn profile_url(user_id: i64) -> String {
    format!("/board/profile/{}/", user_id)
}

/// The visitor, when they own profile `id`. Otherwise the response to send:
/// anonymous visitors go to the login page, other users to the board.
fn owner_of(session: &SessionUser, id: i64) -> Result<AuthenticatedUser, HttpResponse> {
    match session.user() {
        None => Err(redirect(LOGIN_URL)),
        Some(user) if user.id == id => Ok(user.clone()),
        Some(_) => Err(redirect(BOARD_URL)),
    }
}

/// Logs `user` in by setting the session cookie, then redirects to their profile.
fn start_session(keys: &TokenKeys, user: &User) -> Result<HttpResponse, AppError> {
    let token = keys.generate_access(user.id, &user.username)?;
    Ok(HttpResponse::Found()
        .insert_header((actix_web::http::header::LOCATION, profile_url(user.id)))
        .cookie(session_cookie(&token, keys))
        .finish())
}

#[get("/")]
pub async fn ad_list(
    pool: web::Data<SqlitePool>,
    session: SessionUser,
    query: web::Query<AdListQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.to_filter();
    let total = Ad::count_active(&pool, &filter).await?;
    let page = Pagination::new(query.page.as_deref(), ADS_PER_PAGE, total);
    let ads = Ad::list_active(&pool, &filter, &page).await?;
    let categories = Category::all(&pool).await?;

    Ok(ok(pages::ad_list(session.user(), &ads, &categories, &query, &page)))
}

#[get("/ad/{id}/")]
pub async fn ad_detail(
    pool: web::Data<SqlitePool>,
    session: SessionUser,
    ad_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let ad = Ad::find(&pool, ad_id.into_inner()).await?;
    let comments = Comment::for_ad(&pool, ad.id).await?;
    Ok(ok(pages::ad_detail(session.user(), &ad, &comments, &[])))
}

#[post("/ad/{id}/")]
pub async fn add_comment(
    pool: web::Data<SqlitePool>,
    session: SessionUser,
    ad_id: web::Path<i64>,
    form: web::Form<CommentForm>,
) -> Result<HttpResponse, AppError> {
    let Some(user) = session.user() else {
        return Ok(redirect(LOGIN_URL));
    };
    let ad = Ad::find(&pool, ad_id.into_inner()).await?;

    match form.clean() {
        Cleaned::Valid(content) => {
            Comment::create(&pool, ad.id, user.id, &content).await?;
            Ok(redirect(&format!("/board/ad/{}/", ad.id)))
        }
        Cleaned::Invalid(errors) => {
            let comments = Comment::for_ad(&pool, ad.id).await?;
            Ok(ok(pages::ad_detail(Some(user), &ad, &comments, &errors)))
        }
    }
}

#[get("/register/")]
pub async fn register_page(session: SessionUser) -> HttpResponse {
    match session.id() {
        Some(id) => redirect(&profile_url(id)),
        None => ok(pages::register(&RegistrationForm::default(), &[])),
    }
}

#[post("/register/")]
pub async fn register(
    pool: web::Data<SqlitePool>,
    keys: web::Data<TokenKeys>,
    jobs: web::Data<JobQueue>,
    session: SessionUser,
    form: web::Form<RegistrationForm>,
) -> Result<HttpResponse, AppError> {
    if let Some(id) = session.id() {
        return Ok(redirect(&profile_url(id)));
    }

    match form.clean(&pool).await? {
        Cleaned::Valid(registration) => {
            let user = User::create(
                &pool,
                &registration.username,
                &registration.email,
                &registration.password,
                registration.profile,
            )
            .await?;
            enqueue_welcome_mail(&jobs, user.id);
            start_session(&keys, &user)
        }
        Cleaned::Invalid(errors) => Ok(ok(pages::register(&form, &errors))),
    }
}

#[get("/login/")]
pub async fn login_page(session: SessionUser) -> HttpResponse {
    match session.id() {
        Some(id) => redirect(&profile_url(id)),
        None => ok(pages::login("", &[])),
    }
}

#[post("/login/")]
pub async fn login(
    pool: web::Data<SqlitePool>,
    keys: web::Data<TokenKeys>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    let (username, password) = match form.clean() {
        Cleaned::Valid(credentials) => credentials,
        Cleaned::Invalid(errors) => return Ok(ok(pages::login(&form.username, &errors))),
    };

    match User::authenticate(&pool, &username, &password).await {
        Ok(user) => {
            log::info!("{} logged in to the board", user.username);
            start_session(&keys, &user)
        }
        Err(AppError::Unauthorized(_)) => {
            let errors = ["Please enter a correct username and password.".to_string()];
            Ok(ok(pages::login(&username, &errors)))
        }
        Err(e) => Err(e),
    }
}

#[get("/logout/")]
pub async fn logout() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((actix_web::http::header::LOCATION, BOARD_URL))
        .cookie(removal_cookie())
        .finish()
}

async fn load_account(pool: &SqlitePool, id: i64) -> Result<(User, Profile), AppError> {
    let account = User::find(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let profile = Profile::for_user(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;
    Ok((account, profile))
}

#[get("/profile/{id}/")]
pub async fn profile_page(
    pool: web::Data<SqlitePool>,
    session: SessionUser,
    user_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = match owner_of(&session, user_id.into_inner()) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    let (account, profile) = load_account(&pool, user.id).await?;
    let ads = Ad::for_user(&pool, user.id).await?;
    Ok(ok(pages::profile(&user, &account, &profile, &ads)))
}

#[get("/profile/{id}/edit/")]
pub async fn edit_profile_page(
    pool: web::Data<SqlitePool>,
    session: SessionUser,
    user_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = match owner_of(&session, user_id.into_inner()) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    let (_, profile) = load_account(&pool, user.id).await?;
    Ok(ok(pages::profile_edit(&user, &ProfileForm::from(&profile), &[])))
}

#[post("/profile/{id}/edit/")]
pub async fn edit_profile(
    pool: web::Data<SqlitePool>,
    session: SessionUser,
    user_id: web::Path<i64>,
    form: web::Form<ProfileForm>,
) -> Result<HttpResponse, AppError> {
    let user = match owner_of(&session, user_id.into_inner()) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    match form.clean() {
        Cleaned::Valid(update) => {
            Profile::update(&pool, user.id, &update).await?;
            Ok(redirect(&profile_url(user.id)))
        }
        Cleaned::Invalid(errors) => Ok(ok(pages::profile_edit(&user, &form, &errors))),
    }
}

#[get("/profile/{id}/change-password/")]
pub async fn change_password_page(session: SessionUser, user_id: web::Path<i64>) -> HttpResponse {
    match owner_of(&session, user_id.into_inner()) {
        Ok(user) => ok(pages::change_password(&user, &[])),
        Err(response) => response,
    }
}

#[post("/profile/{id}/change-password/")]
pub async fn change_password(
    pool: web::Data<SqlitePool>,
    session: SessionUser,
    user_id: web::Path<i64>,
    form: web::Form<PasswordChangeForm>,
) -> Result<HttpResponse, AppError> {
    let user = match owner_of(&session, user_id.into_inner()) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    let (account, _) = load_account(&pool, user.id).await?;

    match form.clean(&account.password_hash)? {
        Cleaned::Valid(new_password) => {
            User::set_password(&pool, user.id, &new_password).await?;
            log::info!("{} changed their password", user.username);
            Ok(redirect(&profile_url(user.id)))
        }
        Cleaned::Invalid(errors) => Ok(ok(pages::change_password(&user, &errors))),
    }
}

#[get("/profile/{id}/add_ad/")]
pub async fn add_ad_page(
    pool: web::Data<SqlitePool>,
    session: SessionUser,
    user_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = match owner_of(&session, user_id.into_inner()) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    let categories = Category::all(&pool).await?;
    Ok(ok(pages::add_ad(&user, &AdForm::default(), &categories, &[])))
}

#[post("/profile/{id}/add_ad/")]
pub async fn add_ad(
    pool: web::Data<SqlitePool>,
    jobs: web::Data<JobQueue>,
    session: SessionUser,
    user_id: web::Path<i64>,
    form: web::Form<AdForm>,
) -> Result<HttpResponse, AppError> {
    let user = match owner_of(&session, user_id.into_inner()) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };

    let errors = match form.clean() {
        Cleaned::Valid(clean) => match clean.category.resolve(&pool).await? {
            Some(category) => {
                let ad = Ad::create(
                    &pool,
                    &NewAd {
                        title: clean.title,
                        description: clean.description,
                        price: clean.price,
                        user_id: user.id,
                        category_id: category.id,
                    },
                )
                .await?;
                log::info!("{} published ad {}", user.username, ad.id);
                jobs.enqueue(Job::AdCreatedEmail { ad_id: ad.id });
                return Ok(redirect(&profile_url(user.id)));
            }
            None => vec!["The selected category does not exist.".to_string()],
        },
        Cleaned::Invalid(errors) => errors,
    };

    let categories = Category::all(&pool).await?;
    Ok(ok(pages::add_ad(&user, &form, &categories, &errors)))
}

#[get("/statistics/")]
pub async fn statistics(
    pool: web::Data<SqlitePool>,
    session: SessionUser,
) -> Result<HttpResponse, AppError> {
    let stats = BoardStatistics::collect(&pool, Utc::now()).await?;
    Ok(ok(pages::statistics(session.user(), &stats)))
}

/// Only the account owner may see this page; anyone else gets a 404.
fn account_owner(session: &SessionUser, id: i64) -> Result<AuthenticatedUser, AppError> {
    session
        .user()
        .filter(|user| user.id == id)
        .cloned()
        .ok_or_else(|| AppError::NotFound("Account not found".into()))
}

#[get("/delete-account/{id}/")]
pub async fn delete_account_page(
    session: SessionUser,
    user_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = account_owner(&session, user_id.into_inner())?;
    Ok(ok(pages::delete_account(&user)))
}

#[post("/delete-account/{id}/")]
pub async fn delete_account(
    pool: web::Data<SqlitePool>,
    session: SessionUser,
    user_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user = account_owner(&session, user_id.into_inner())?;
    User::delete(&pool, user.id).await?;

    Ok(HttpResponse::Found()
        .insert_header((actix_web::http::header::LOCATION, BOARD_URL))
        .cookie(removal_cookie())
        .finish())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/board")
            .service(ad_list)
            .service(ad_detail)
            .service(add_comment)
            .service(register_page)
            .service(register)
            .service(login_page)
            .service(login)
            .service(logout)
            .service(profile_page)
            .service(edit_profile_page)
            .service(edit_profile)
            .service(change_password_page)
            .service(change_password)
            .service(add_ad_page)
            .service(add_ad)
            .service(statistics)
            .service(delete_account_page)
            .service(delete_account),
    );
}
