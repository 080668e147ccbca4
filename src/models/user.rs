use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::auth::{hash_password, verify_password};
use crate::config::AdminSeed;
use crate::error::AppError;

const USER_COLUMNS: &str = "id, username, email, password_hash, is_staff, is_active, created_at";

/// A site account, shared by the board and the library API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Staff users may delete books and users and read token usage.
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Extra details kept for every user; created together with the user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub bio: Option<String>,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub email: String,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub email: Option<String>,
}

/// Optional profile details supplied at registration.
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub location: Option<String>,
}

impl User {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    /// The user behind a token: `None` once the account is deleted or deactivated.
    pub async fn find_active(pool: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = ? AND is_active = 1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn username_taken(pool: &SqlitePool, username: &str) -> Result<bool, AppError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(found.is_some())
    }

    /// An address counts as taken if any account or profile uses it.
    pub async fn email_taken(pool: &SqlitePool, email: &str) -> Result<bool, AppError> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM users WHERE email = ? UNION SELECT id FROM profiles WHERE email = ? LIMIT 1",
        )
        .bind(email)
        .bind(email)
        .fetch_optional(pool)
        .await?;
        Ok(found.is_some())
    }

    /// Creates the user and its profile in one transaction.
    pub async fn create(
        pool: &SqlitePool,
        username: &str,
        email: &str,
        password: &str,
        profile: NewProfile,
    ) -> Result<User, AppError> {
        Self::insert(pool, username, email, password, false, profile).await
    }

    async fn insert(
        pool: &SqlitePool,
        username: &str,
        email: &str,
        password: &str,
        is_staff: bool,
        profile: NewProfile,
    ) -> Result<User, AppError> {
        if Self::username_taken(pool, username).await? {
            return Err(AppError::BadRequest(
                "A user with that username already exists.".into(),
            ));
        }

        let password_hash = hash_password(password)?;
        let now = Utc::now();

        let mut tx = pool.begin().await?;
        let user_id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, is_staff, is_active, created_at)
             VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(is_staff)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO profiles (user_id, phone_number, birth_date, location, email)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&profile.phone_number)
        .bind(profile.birth_date)
        .bind(&profile.location)
        .bind(email)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        log::info!("created user {} ({})", username, user_id);

        Ok(User {
            id: user_id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            is_staff,
            is_active: true,
            created_at: now,
        })
    }

    /// Creates the configured staff account unless the username already exists.
    pub async fn ensure_admin(pool: &SqlitePool, seed: &AdminSeed) -> Result<(), AppError> {
        if Self::username_taken(pool, &seed.username).await? {
            return Ok(());
        }
        Self::insert(
            pool,
            &seed.username,
            &seed.email,
            &seed.password,
            true,
            NewProfile::default(),
        )
        .await?;
        log::info!("seeded staff account {}", seed.username);
        Ok(())
    }

    /// Checks a username/password pair. Unknown users, wrong passwords and
    /// inactive accounts all produce the same `Unauthorized` error.
    pub async fn authenticate(
        pool: &SqlitePool,
        username: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let invalid = || AppError::Unauthorized("No active account found with the given credentials".into());

        let user = Self::find_by_username(pool, username)
            .await?
            .ok_or_else(invalid)?;

        if !user.is_active || !verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }
        Ok(user)
    }

    /// Loads the caller and fails with `Forbidden` unless they are staff.
    pub async fn require_staff(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
        let user = Self::find(pool, id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;

        if !user.is_staff {
            return Err(AppError::Forbidden(
                "You do not have permission to perform this action.".into(),
            ));
        }
        Ok(user)
    }

    pub async fn set_password(pool: &SqlitePool, id: i64, password: &str) -> Result<(), AppError> {
        let password_hash = hash_password(password)?;
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Deletes the user with everything they own.
    ///
    /// Books last edited by the user keep their `updated_by` name with a
    /// "(deleted)" suffix.
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
        let user = Self::find(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let mut tx = pool.begin().await?;
        sqlx::query("UPDATE books SET updated_by = ? WHERE updated_by = ?")
            .bind(format!("{} (deleted)", user.username))
            .bind(&user.username)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        log::info!("deleted user {} ({})", user.username, id);
        Ok(())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, AppError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?)
    }
}

impl Profile {
    pub async fn for_user(pool: &SqlitePool, user_id: i64) -> Result<Option<Profile>, AppError> {
        Ok(sqlx::query_as::<_, Profile>(
            "SELECT id, user_id, bio, phone_number, birth_date, location, email
             FROM profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
    }

    /// Overwrites the editable fields. An absent email keeps the current one.
    pub async fn update(
        pool: &SqlitePool,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> Result<Profile, AppError> {
        let result = sqlx::query(
            "UPDATE profiles
             SET bio = ?, phone_number = ?, birth_date = ?, location = ?, email = COALESCE(?, email)
             WHERE user_id = ?",
        )
        .bind(&update.bio)
        .bind(&update.phone_number)
        .bind(update.birth_date)
        .bind(&update.location)
        .bind(&update.email)
        .bind(user_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Profile not found".into()));
        }

        Self::for_user(pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[actix_rt::test]
    async fn test_create_and_authenticate() {
        let pool = db::connect_in_memory().await.unwrap();
        let user = User::create(&pool, "testuser", "t@example.com", "testpass1", NewProfile::default())
            .await
            .unwrap();

        assert!(!user.is_staff);
        assert!(Profile::for_user(&pool, user.id).await.unwrap().is_some());

        let found = User::authenticate(&pool, "testuser", "testpass1").await.unwrap();
        assert_eq!(found.id, user.id);
        assert!(matches!(
            User::authenticate(&pool, "testuser", "wrong-pass").await,
            Err(AppError::Unauthorized(_))
        ));

        let duplicate =
            User::create(&pool, "testuser", "other@example.com", "testpass1", NewProfile::default()).await;
        assert!(matches!(duplicate, Err(AppError::BadRequest(_))));
        assert!(User::email_taken(&pool, "t@example.com").await.unwrap());
    }

    #[actix_rt::test]
    async fn test_require_staff() {
        let pool = db::connect_in_memory().await.unwrap();
        let seed = AdminSeed {
            username: "adminuser".into(),
            email: "admin@example.com".into(),
            password: "adminpass".into(),
        };
        User::ensure_admin(&pool, &seed).await.unwrap();
        User::ensure_admin(&pool, &seed).await.unwrap();
        assert_eq!(User::count(&pool).await.unwrap(), 1);

        let admin = User::find_by_username(&pool, "adminuser").await.unwrap().unwrap();
        assert!(User::require_staff(&pool, admin.id).await.is_ok());

        let user = User::create(&pool, "plain", "p@example.com", "plainpass", NewProfile::default())
            .await
            .unwrap();
        assert!(matches!(
            User::require_staff(&pool, user.id).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[actix_rt::test]
    async fn test_profile_update_keeps_email_when_absent() {
        let pool = db::connect_in_memory().await.unwrap();
        let user = User::create(&pool, "editor", "e@example.com", "editorpass", NewProfile::default())
            .await
            .unwrap();

        let update = ProfileUpdate {
            bio: Some("Sells bikes".into()),
            location: Some("Kyiv".into()),
            ..Default::default()
        };
        let profile = Profile::update(&pool, user.id, &update).await.unwrap();
        assert_eq!(profile.bio.as_deref(), Some("Sells bikes"));
        assert_eq!(profile.email, "e@example.com");
    }
}
