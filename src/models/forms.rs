//! Board form payloads and their cleaning rules.
//!
//! Every form deserializes from `application/x-www-form-urlencoded` with all
//! fields optional, so a half-filled form still reaches `clean` and can be
//! re-rendered with its messages. Blank optional fields become `None`.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::{Validate, ValidationErrors};

use crate::auth::{password_problems, verify_password, USERNAME_REGEX};
use crate::error::AppError;
use crate::models::board::{AdFilter, Category};
use crate::models::user::{NewProfile, Profile, ProfileUpdate, User};
use crate::search::normalize;

lazy_static! {
    // International format: a plus, a non-zero digit, then 7 to 14 digits.
    pub static ref PHONE_REGEX: regex::Regex = regex::Regex::new(r"^\+[1-9]\d{7,14}$").unwrap();
}

pub const PHONE_MESSAGE: &str = "The phone number is not in a valid format. Please include the \
     country code and the correct number of digits (like '+380961231122').";
pub const MAX_CATEGORY_NAME_LEN: usize = 100;

/// Outcome of cleaning a form: the typed values, or the messages to show.
#[derive(Debug)]
pub enum Cleaned<T> {
    Valid(T),
    Invalid(Vec<String>),
}

impl<T> Cleaned<T> {
    fn from_errors(errors: Vec<String>, value: impl FnOnce() -> T) -> Self {
        if errors.is_empty() {
            Cleaned::Valid(value())
        } else {
            Cleaned::Invalid(errors)
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Flattens validator output into "field: message" lines, sorted by field.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);
    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: invalid value ({})", field, e.code),
            })
        })
        .collect()
}

fn field_messages<V: Validate>(form: &V) -> Vec<String> {
    match form.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => validation_messages(&errors),
    }
}

fn parse_phone(raw: &str, errors: &mut Vec<String>) -> Option<String> {
    let phone = non_empty(raw)?;
    if !PHONE_REGEX.is_match(&phone) {
        errors.push(PHONE_MESSAGE.to_string());
    }
    Some(phone)
}

fn parse_birth_date(raw: &str, errors: &mut Vec<String>) -> Option<NaiveDate> {
    let raw = non_empty(raw)?;
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push("Enter a valid date (YYYY-MM-DD).".to_string());
            None
        }
    }
}

/// Where a new ad's category comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryChoice {
    Existing(i64),
    New(String),
}

impl CategoryChoice {
    /// Looks up the chosen category, creating a new one by name if needed.
    /// `None` means the selected id does not exist.
    pub async fn resolve(&self, pool: &SqlitePool) -> Result<Option<Category>, AppError> {
        match self {
            CategoryChoice::Existing(id) => Category::find(pool, *id).await,
            CategoryChoice::New(name) => Category::get_or_create(pool, name).await.map(Some),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct AdForm {
    #[validate(length(max = 255, message = "Title cannot exceed 255 characters."))]
    pub title: String,
    pub description: String,
    pub price: String,
    pub existing_category: String,
    pub new_category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanAd {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: CategoryChoice,
}

impl AdForm {
    pub fn clean(&self) -> Cleaned<CleanAd> {
        let mut errors = field_messages(self);

        let title = non_empty(&self.title);
        if title.is_none() {
            errors.push("Title is required.".to_string());
        }
        let description = non_empty(&self.description);
        if description.is_none() {
            errors.push("Description is required.".to_string());
        }

        let price = match self.price.trim().parse::<f64>() {
            Ok(p) if p.is_finite() && p > 0.0 => p,
            Ok(_) => {
                errors.push("Price must be greater than zero.".to_string());
                0.0
            }
            Err(_) => {
                errors.push("Enter a valid price.".to_string());
                0.0
            }
        };

        let existing = self.existing_category.trim();
        let wants_new = !self.new_category.is_empty();
        let mut category = None;

        if existing.is_empty() && !wants_new {
            errors.push("Choose an existing category or create a new one.".to_string());
        } else if !existing.is_empty() && wants_new {
            errors.push("Choose only one category.".to_string());
        } else if wants_new {
            match non_empty(&self.new_category) {
                None => errors.push("New category name cannot be empty.".to_string()),
                Some(name) if name.chars().count() > MAX_CATEGORY_NAME_LEN => errors.push(format!(
                    "Category name cannot exceed {} characters.",
                    MAX_CATEGORY_NAME_LEN
                )),
                Some(name) => category = Some(CategoryChoice::New(name)),
            }
        } else {
            match existing.parse::<i64>() {
                Ok(id) => category = Some(CategoryChoice::Existing(id)),
                Err(_) => errors.push("The selected category does not exist.".to_string()),
            }
        }

        match (title, description, category) {
            (Some(title), Some(description), Some(category)) if errors.is_empty() => {
                Cleaned::Valid(CleanAd {
                    title,
                    description,
                    price,
                    category,
                })
            }
            _ => Cleaned::Invalid(errors),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub content: String,
}

impl CommentForm {
    pub fn clean(&self) -> Cleaned<String> {
        match non_empty(&self.content) {
            Some(content) => Cleaned::Valid(content),
            None => Cleaned::Invalid(vec!["Comment cannot be empty.".to_string()]),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct RegistrationForm {
    #[validate(
        length(min = 1, max = 100, message = "Username must be between 1 and 100 characters."),
        regex(
            path = "USERNAME_REGEX",
            message = "Username may contain only letters, digits and @/./+/-/_"
        )
    )]
    pub username: String,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 255, message = "Email cannot exceed 255 characters.")
    )]
    pub email: String,
    #[validate(length(min = 8, message = "Password must contain at least 8 characters."))]
    pub password1: String,
    pub password2: String,
    #[validate(length(max = 20, message = "Phone number cannot exceed 20 characters."))]
    pub phone_number: String,
    pub birth_date: String,
    #[validate(length(max = 255, message = "Location cannot exceed 255 characters."))]
    pub location: String,
}

/// A registration that passed every check, ready for `User::create`.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile: NewProfile,
}

impl RegistrationForm {
    pub async fn clean(&self, pool: &SqlitePool) -> Result<Cleaned<Registration>, AppError> {
        let mut errors = field_messages(self);

        if self.password1 != self.password2 {
            errors.push("Passwords do not match.".to_string());
        }
        let phone_number = parse_phone(&self.phone_number, &mut errors);
        let birth_date = parse_birth_date(&self.birth_date, &mut errors);

        if User::username_taken(pool, &self.username).await? {
            errors.push("A user with that username already exists.".to_string());
        }
        if User::email_taken(pool, &self.email).await? {
            errors.push("This email address is already in use.".to_string());
        }

        Ok(Cleaned::from_errors(errors, || Registration {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password1.clone(),
            profile: NewProfile {
                phone_number,
                birth_date,
                location: non_empty(&self.location),
            },
        }))
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub bio: String,
    pub phone_number: String,
    pub birth_date: String,
    pub location: String,
    pub email: String,
}

impl ProfileForm {
    pub fn clean(&self) -> Cleaned<ProfileUpdate> {
        let mut errors = Vec::new();
        let phone_number = parse_phone(&self.phone_number, &mut errors);
        let birth_date = parse_birth_date(&self.birth_date, &mut errors);
        let email = non_empty(&self.email);
        if let Some(email) = &email {
            if !validator::validate_email(email.as_str()) {
                errors.push("Enter a valid email address.".to_string());
            }
        }

        Cleaned::from_errors(errors, || ProfileUpdate {
            bio: non_empty(&self.bio),
            phone_number,
            birth_date,
            location: non_empty(&self.location),
            email,
        })
    }
}

impl From<&Profile> for ProfileForm {
    fn from(profile: &Profile) -> Self {
        Self {
            bio: profile.bio.clone().unwrap_or_default(),
            phone_number: profile.phone_number.clone().unwrap_or_default(),
            birth_date: profile
                .birth_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            location: profile.location.clone().unwrap_or_default(),
            email: profile.email.clone(),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

impl PasswordChangeForm {
    /// Checks against the user's current password hash and returns the new password.
    pub fn clean(&self, current_hash: &str) -> Result<Cleaned<String>, AppError> {
        let mut errors = Vec::new();
        if !verify_password(&self.old_password, current_hash)? {
            errors.push("Your current password is incorrect.".to_string());
        }
        if !self.new_password1.is_empty() && self.new_password1 == self.old_password {
            errors.push("The new password must differ from the old one.".to_string());
        }
        if self.new_password1 != self.new_password2 {
            errors.push("The two password fields didn't match.".to_string());
        }
        errors.extend(password_problems(&self.new_password1));

        Ok(Cleaned::from_errors(errors, || self.new_password1.clone()))
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Username is required."))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

impl LoginForm {
    pub fn clean(&self) -> Cleaned<(String, String)> {
        Cleaned::from_errors(field_messages(self), || {
            (self.username.trim().to_string(), self.password.clone())
        })
    }
}

/// Query string of the ad list. Values stay raw so the filter form can echo
/// them; unparsable numbers are ignored rather than rejected.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AdListQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub page: Option<String>,
}

impl AdListQuery {
    pub fn to_filter(&self) -> AdFilter {
        let number = |raw: &Option<String>| raw.as_deref().and_then(|v| v.trim().parse::<f64>().ok());
        AdFilter {
            search: self.q.as_deref().and_then(normalize),
            category_id: self.category.as_deref().and_then(|v| v.trim().parse().ok()),
            min_price: number(&self.min_price).filter(|p| p.is_finite()),
            max_price: number(&self.max_price).filter(|p| p.is_finite()),
        }
    }

    /// Non-empty filter parameters in a stable order, for pagination links.
    pub fn filter_params(&self) -> Vec<(&'static str, &str)> {
        [
            ("q", &self.q),
            ("category", &self.category),
            ("min_price", &self.min_price),
            ("max_price", &self.max_price),
        ]
        .into_iter()
        .filter_map(|(name, value)| match value.as_deref() {
            Some(v) if !v.trim().is_empty() => Some((name, v)),
            _ => None,
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::db;

    fn ad_form(existing: &str, new: &str) -> AdForm {
        AdForm {
            title: "Road bike".into(),
            description: "Barely used".into(),
            price: "250.50".into(),
            existing_category: existing.into(),
            new_category: new.into(),
        }
    }

    fn messages<T>(cleaned: Cleaned<T>) -> Vec<String> {
        match cleaned {
            Cleaned::Valid(_) => Vec::new(),
            Cleaned::Invalid(errors) => errors,
        }
    }

    #[test]
    fn test_ad_form_category_rules() {
        assert_eq!(
            messages(ad_form("", "").clean()),
            vec!["Choose an existing category or create a new one."]
        );
        assert_eq!(messages(ad_form("3", "Bikes").clean()), vec!["Choose only one category."]);
        assert_eq!(
            messages(ad_form("", "   ").clean()),
            vec!["New category name cannot be empty."]
        );

        match ad_form("", " Bikes ").clean() {
            Cleaned::Valid(ad) => {
                assert_eq!(ad.category, CategoryChoice::New("Bikes".into()));
                assert_eq!(ad.price, 250.5);
            }
            Cleaned::Invalid(errors) => panic!("unexpected errors: {:?}", errors),
        }
        match ad_form("7", "").clean() {
            Cleaned::Valid(ad) => assert_eq!(ad.category, CategoryChoice::Existing(7)),
            Cleaned::Invalid(errors) => panic!("unexpected errors: {:?}", errors),
        }
    }

    #[test]
    fn test_ad_form_price() {
        let mut form = ad_form("1", "");
        form.price = "-5".into();
        assert_eq!(messages(form.clean()), vec!["Price must be greater than zero."]);
        form.price = "cheap".into();
        assert_eq!(messages(form.clean()), vec!["Enter a valid price."]);
    }

    #[test]
    fn test_ad_form_requires_text_after_trimming() {
        let mut form = ad_form("1", "");
        form.title = "   ".into();
        form.description = "\n\t ".into();
        assert_eq!(
            messages(form.clean()),
            vec!["Title is required.", "Description is required."]
        );

        form.title = "x".repeat(256);
        form.description = "Fine".into();
        assert_eq!(
            messages(form.clean()),
            vec!["title: Title cannot exceed 255 characters."]
        );

        form.title = "  Road bike ".into();
        form.description = " Barely used\n".into();
        match form.clean() {
            Cleaned::Valid(ad) => {
                assert_eq!(ad.title, "Road bike");
                assert_eq!(ad.description, "Barely used");
            }
            Cleaned::Invalid(errors) => panic!("unexpected errors: {:?}", errors),
        }
    }

    #[test]
    fn test_ad_list_query_is_lenient() {
        let query = AdListQuery {
            q: Some("  bike ".into()),
            category: Some("abc".into()),
            min_price: Some("10".into()),
            max_price: Some("NaN".into()),
            page: Some("2".into()),
        };
        assert_eq!(
            query.to_filter(),
            AdFilter {
                search: Some("bike".into()),
                category_id: None,
                min_price: Some(10.0),
                max_price: None,
            }
        );
        assert_eq!(
            query.filter_params(),
            vec![("q", "  bike "), ("category", "abc"), ("min_price", "10"), ("max_price", "NaN")]
        );
    }

    #[test]
    fn test_phone_regex() {
        assert!(PHONE_REGEX.is_match("+380961231122"));
        assert!(!PHONE_REGEX.is_match("0961231122"));
        assert!(!PHONE_REGEX.is_match("+0961231122"));
        assert!(!PHONE_REGEX.is_match("+38"));
        assert!(!PHONE_REGEX.is_match("+380 96 123 11 22"));
        assert!(!PHONE_REGEX.is_match("+3809612311221234"));
        // Shape only: unassigned country codes pass.
        assert!(PHONE_REGEX.is_match("+99912345678"));
    }

    #[test]
    fn test_profile_form_blank_fields_are_none() {
        let form = ProfileForm {
            bio: "  ".into(),
            location: "Lviv".into(),
            ..Default::default()
        };
        match form.clean() {
            Cleaned::Valid(update) => {
                assert_eq!(update.bio, None);
                assert_eq!(update.location.as_deref(), Some("Lviv"));
                assert_eq!(update.email, None);
            }
            Cleaned::Invalid(errors) => panic!("unexpected errors: {:?}", errors),
        }

        let bad = ProfileForm {
            email: "not-an-email".into(),
            birth_date: "31/12/1990".into(),
            ..Default::default()
        };
        assert_eq!(messages(bad.clean()).len(), 2);
    }

    #[test]
    fn test_password_change_rules() {
        let hash = hash_password("oldpassword").unwrap();

        let same = PasswordChangeForm {
            old_password: "oldpassword".into(),
            new_password1: "oldpassword".into(),
            new_password2: "oldpassword".into(),
        };
        assert_eq!(
            messages(same.clean(&hash).unwrap()),
            vec!["The new password must differ from the old one."]
        );

        let numeric = PasswordChangeForm {
            old_password: "oldpassword".into(),
            new_password1: "12345678".into(),
            new_password2: "12345678".into(),
        };
        assert_eq!(
            messages(numeric.clean(&hash).unwrap()),
            vec!["Password cannot be entirely numeric."]
        );

        let wrong_old = PasswordChangeForm {
            old_password: "nope".into(),
            new_password1: "brandnewpass".into(),
            new_password2: "brandnewpass".into(),
        };
        assert_eq!(
            messages(wrong_old.clean(&hash).unwrap()),
            vec!["Your current password is incorrect."]
        );
    }

    #[actix_rt::test]
    async fn test_registration_form() {
        let pool = db::connect_in_memory().await.unwrap();
        User::create(&pool, "taken", "taken@example.com", "takenpass", NewProfile::default())
            .await
            .unwrap();

        let form = RegistrationForm {
            username: "taken".into(),
            email: "taken@example.com".into(),
            password1: "password123".into(),
            password2: "password124".into(),
            phone_number: "12345".into(),
            ..Default::default()
        };
        let errors = messages(form.clean(&pool).await.unwrap());
        assert!(errors.contains(&"Passwords do not match.".to_string()));
        assert!(errors.contains(&PHONE_MESSAGE.to_string()));
        assert!(errors.contains(&"A user with that username already exists.".to_string()));
        assert!(errors.contains(&"This email address is already in use.".to_string()));

        let form = RegistrationForm {
            username: "newcomer".into(),
            email: "new@example.com".into(),
            password1: "password123".into(),
            password2: "password123".into(),
            phone_number: "+380961231122".into(),
            birth_date: "1990-05-17".into(),
            location: "".into(),
        };
        match form.clean(&pool).await.unwrap() {
            Cleaned::Valid(reg) => {
                assert_eq!(reg.username, "newcomer");
                assert_eq!(reg.profile.birth_date, NaiveDate::from_ymd_opt(1990, 5, 17));
                assert_eq!(reg.profile.location, None);
            }
            Cleaned::Invalid(errors) => panic!("unexpected errors: {:?}", errors),
        }
    }
}
