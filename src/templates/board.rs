use std::fmt::Write;

use crate::auth::AuthenticatedUser;
use crate::models::forms::{AdForm, AdListQuery, ProfileForm, RegistrationForm};
use crate::models::{Ad, BoardStatistics, Category, Comment, Profile, User};
use crate::pagination::Pagination;

use super::{encode_query, error_list, escape, form, input, layout, textarea};

fn ad_card(ad: &Ad) -> String {
    format!(
        r#"<article class="ad"><h2><a href="/board/ad/{id}/">{title}</a></h2><p>{teaser}</p><p>{price:.2} &middot; {category} &middot; {user} &middot; {created}</p></article>"#,
        id = ad.id,
        title = escape(&ad.title),
        teaser = escape(&ad.short_description()),
        price = ad.price,
        category = escape(&ad.category_name),
        user = escape(&ad.username),
        created = ad.created_at.format("%Y-%m-%d %H:%M"),
    )
}

fn category_options(categories: &[Category], selected: &str) -> String {
    let mut options = String::from(r#"<option value="">---------</option>"#);
    for category in categories {
        let id = category.id.to_string();
        let _ = write!(
            options,
            r#"<option value="{id}"{sel}>{name}</option>"#,
            id = id,
            sel = if id == selected { " selected" } else { "" },
            name = escape(&category.name),
        );
    }
    options
}

fn page_link(query: &AdListQuery, page: u32, label: &str) -> String {
    let mut href = format!("/board/?page={}", page);
    for (name, value) in query.filter_params() {
        let _ = write!(href, "&{}={}", name, encode_query(value));
    }
    format!(r#"<a href="{}">{}</a>"#, escape(&href), escape(label))
}

pub fn ad_list(
    user: Option<&AuthenticatedUser>,
    ads: &[Ad],
    categories: &[Category],
    query: &AdListQuery,
    page: &Pagination,
) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        r#"<form method="get" action="/board/" class="filters"><input name="q" placeholder="Search" value="{q}"> <select name="category">{options}</select> <input name="min_price" placeholder="Min price" value="{min}"> <input name="max_price" placeholder="Max price" value="{max}"> <button type="submit">Filter</button></form>"#,
        q = escape(query.q.as_deref().unwrap_or("")),
        options = category_options(categories, query.category.as_deref().unwrap_or("")),
        min = escape(query.min_price.as_deref().unwrap_or("")),
        max = escape(query.max_price.as_deref().unwrap_or("")),
    );

    if ads.is_empty() {
        body.push_str("<p>No ads found.</p>");
    }
    for ad in ads {
        body.push_str(&ad_card(ad));
    }

    body.push_str(r#"<div class="pagination">"#);
    if page.has_previous() {
        body.push_str(&page_link(query, page.page - 1, "Previous"));
    }
    let _ = write!(body, " Page {} of {} ", page.page, page.total_pages());
    if page.has_next() {
        body.push_str(&page_link(query, page.page + 1, "Next"));
    }
    body.push_str("</div>");

    layout("Ads", user, &body)
}

pub fn ad_detail(
    user: Option<&AuthenticatedUser>,
    ad: &Ad,
    comments: &[Comment],
    errors: &[String],
) -> String {
    let mut body = format!(
        r#"<p class="meta">{category} &middot; {price:.2} &middot; posted by {seller} on {created}{inactive}</p><div class="description">{description}</div>"#,
        category = escape(&ad.category_name),
        price = ad.price,
        seller = escape(&ad.username),
        created = ad.created_at.format("%Y-%m-%d %H:%M"),
        inactive = if ad.is_active { "" } else { " (inactive)" },
        description = escape(&ad.description),
    );

    let _ = write!(body, "<h2>Comments ({})</h2>", comments.len());
    for comment in comments {
        let _ = write!(
            body,
            r#"<div class="comment"><strong>{user}</strong> <time>{at}</time><p>{content}</p></div>"#,
            user = escape(&comment.username),
            at = comment.created_at.format("%Y-%m-%d %H:%M"),
            content = escape(&comment.content),
        );
    }

    body.push_str(&error_list(errors));
    if user.is_some() {
        body.push_str(&form(
            &format!("/board/ad/{}/", ad.id),
            &textarea("Comment", "content", ""),
            "Add comment",
        ));
    } else {
        body.push_str(r#"<p><a href="/board/login/">Log in</a> to comment.</p>"#);
    }

    layout(&ad.title, user, &body)
}

pub fn register(form_values: &RegistrationForm, errors: &[String]) -> String {
    let fields = [
        input("Username", "username", "text", &form_values.username),
        input("Email", "email", "email", &form_values.email),
        input("Password", "password1", "password", ""),
        input("Repeat password", "password2", "password", ""),
        input("Phone number", "phone_number", "text", &form_values.phone_number),
        input("Birth date", "birth_date", "date", &form_values.birth_date),
        input("Location", "location", "text", &form_values.location),
    ]
    .concat();

    let body = format!("{}{}", error_list(errors), form("/board/register/", &fields, "Register"));
    layout("Register", None, &body)
}

pub fn login(username: &str, errors: &[String]) -> String {
    let fields = [
        input("Username", "username", "text", username),
        input("Password", "password", "password", ""),
    ]
    .concat();
    let body = format!("{}{}", error_list(errors), form("/board/login/", &fields, "Log in"));
    layout("Log in", None, &body)
}

pub fn profile(user: &AuthenticatedUser, account: &User, profile: &Profile, ads: &[Ad]) -> String {
    let optional = |value: &Option<String>| escape(value.as_deref().unwrap_or("-"));
    let mut body = format!(
        r#"<dl><dt>Username</dt><dd>{username}</dd><dt>Email</dt><dd>{email}</dd><dt>Bio</dt><dd>{bio}</dd><dt>Phone</dt><dd>{phone}</dd><dt>Birth date</dt><dd>{birth}</dd><dt>Location</dt><dd>{location}</dd></dl>"#,
        username = escape(&account.username),
        email = escape(&profile.email),
        bio = optional(&profile.bio),
        phone = optional(&profile.phone_number),
        birth = profile
            .birth_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string()),
        location = optional(&profile.location),
    );

    let _ = write!(
        body,
        r#"<p><a href="/board/profile/{id}/edit/">Edit profile</a> <a href="/board/profile/{id}/change-password/">Change password</a> <a href="/board/profile/{id}/add_ad/">Add ad</a> <a href="/board/delete-account/{id}/">Delete account</a></p>"#,
        id = account.id
    );

    let _ = write!(body, "<h2>My ads ({})</h2>", ads.len());
    for ad in ads {
        body.push_str(&ad_card(ad));
    }

    layout("Profile", Some(user), &body)
}

pub fn profile_edit(user: &AuthenticatedUser, values: &ProfileForm, errors: &[String]) -> String {
    let fields = [
        textarea("Bio", "bio", &values.bio),
        input("Phone number", "phone_number", "text", &values.phone_number),
        input("Birth date", "birth_date", "date", &values.birth_date),
        input("Location", "location", "text", &values.location),
        input("Email", "email", "email", &values.email),
    ]
    .concat();
    let action = format!("/board/profile/{}/edit/", user.id);
    let body = format!("{}{}", error_list(errors), form(&action, &fields, "Save"));
    layout("Edit profile", Some(user), &body)
}

pub fn change_password(user: &AuthenticatedUser, errors: &[String]) -> String {
    let fields = [
        input("Current password", "old_password", "password", ""),
        input("New password", "new_password1", "password", ""),
        input("Confirm new password", "new_password2", "password", ""),
    ]
    .concat();
    let action = format!("/board/profile/{}/change-password/", user.id);
    let body = format!("{}{}", error_list(errors), form(&action, &fields, "Change password"));
    layout("Change password", Some(user), &body)
}

pub fn add_ad(
    user: &AuthenticatedUser,
    values: &AdForm,
    categories: &[Category],
    errors: &[String],
) -> String {
    let fields = format!(
        r#"{title}{description}{price}<p><label for="existing_category">Choose a category</label> <select id="existing_category" name="existing_category">{options}</select></p>{new_category}"#,
        title = input("Title", "title", "text", &values.title),
        description = textarea("Description", "description", &values.description),
        price = input("Price", "price", "text", &values.price),
        options = category_options(categories, values.existing_category.trim()),
        new_category = input("New category", "new_category", "text", &values.new_category),
    );
    let action = format!("/board/profile/{}/add_ad/", user.id);
    let body = format!("{}{}", error_list(errors), form(&action, &fields, "Publish"));
    layout("New ad", Some(user), &body)
}

pub fn statistics(user: Option<&AuthenticatedUser>, stats: &BoardStatistics) -> String {
    let mut body = format!(
        "<ul><li>Ads in the last 30 days: {}</li><li>Active ads: {}</li><li>Inactive ads: {}</li><li>Comments: {}</li></ul>",
        stats.ads_last_month, stats.active_ads, stats.inactive_ads, stats.comments_count
    );
    body.push_str("<table><tr><th>Category</th><th>Ads</th><th>Active</th></tr>");
    for row in &stats.category_stats {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&row.name),
            row.num_ads,
            row.active_ads
        );
    }
    body.push_str("</table>");
    layout("Statistics", user, &body)
}

pub fn delete_account(user: &AuthenticatedUser) -> String {
    let body = format!(
        "<p>Delete the account <strong>{}</strong> with all its ads and comments? This cannot be undone.</p>{}",
        escape(&user.username),
        form(&format!("/board/delete-account/{}/", user.id), "", "Delete account")
    );
    layout("Delete account", Some(user), &body)
}
