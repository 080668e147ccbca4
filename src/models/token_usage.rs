use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, SqlitePool};

use crate::error::AppError;

/// SHA-256 of a token, hex encoded. Only the hash of an issued token is stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// One issued access token: who got it, when, and from which address.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct TokenUsage {
    pub id: i64,
    /// Username of the token's owner.
    pub user: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
}

impl TokenUsage {
    pub async fn record(
        pool: &SqlitePool,
        user_id: i64,
        access_token: &str,
        ip_address: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO token_usage (user_id, token_hash, created_at, ip_address) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(hash_token(access_token))
        .bind(Utc::now())
        .bind(ip_address)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// All records, or only those of `user_id`, oldest first.
    pub async fn list(pool: &SqlitePool, user_id: Option<i64>) -> Result<Vec<TokenUsage>, AppError> {
        Ok(sqlx::query_as::<_, TokenUsage>(
            "SELECT t.id, u.username AS user, t.token_hash, t.created_at, t.ip_address
             FROM token_usage t JOIN users u ON u.id = t.user_id
             WHERE ? IS NULL OR t.user_id = ?
             ORDER BY t.id",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(pool)
        .await?)
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM token_usage WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Token record not found".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::user::{NewProfile, User};

    #[test]
    fn test_hash_token() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[actix_rt::test]
    async fn test_record_list_delete() {
        let pool = db::connect_in_memory().await.unwrap();
        let a = User::create(&pool, "alice", "a@example.com", "alicepass", NewProfile::default())
            .await
            .unwrap();
        let b = User::create(&pool, "bob", "b@example.com", "bobpass12", NewProfile::default())
            .await
            .unwrap();

        TokenUsage::record(&pool, a.id, "token-a", Some("127.0.0.1")).await.unwrap();
        TokenUsage::record(&pool, b.id, "token-b", None).await.unwrap();

        assert_eq!(TokenUsage::list(&pool, None).await.unwrap().len(), 2);
        let only_bob = TokenUsage::list(&pool, Some(b.id)).await.unwrap();
        assert_eq!(only_bob.len(), 1);
        assert_eq!(only_bob[0].user, "bob");
        assert_eq!(only_bob[0].token_hash, hash_token("token-b"));

        TokenUsage::delete(&pool, only_bob[0].id).await.unwrap();
        assert!(matches!(
            TokenUsage::delete(&pool, only_bob[0].id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
