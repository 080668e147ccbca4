use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::AppError;
use crate::pagination::Pagination;
use crate::search::{folded_pattern, search_key};

/// Ads stop being listed this many days after creation.
pub const AD_LIFETIME_DAYS: i64 = 30;
/// Length of the description teaser shown in listings.
pub const SHORT_DESCRIPTION_LEN: usize = 100;
pub const ADS_PER_PAGE: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// A listing, joined with its category name and the seller's username.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ad {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
    pub user_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub username: String,
}

/// Validated values for a new ad.
#[derive(Debug, Clone)]
pub struct NewAd {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub user_id: i64,
    pub category_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub ad_id: i64,
    pub user_id: i64,
    pub username: String,
}

/// Narrowing applied to the public ad list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdFilter {
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryStat {
    pub name: String,
    pub num_ads: i64,
    pub active_ads: i64,
}

/// Figures shown on the statistics page.
#[derive(Debug, Clone, Serialize)]
pub struct BoardStatistics {
    pub ads_last_month: i64,
    pub active_ads: i64,
    pub inactive_ads: i64,
    pub comments_count: i64,
    pub category_stats: Vec<CategoryStat>,
}

const AD_SELECT: &str = "SELECT a.id, a.title, a.description, a.price, a.created_at, a.updated_at, \
     a.is_active, a.user_id, a.category_id, c.name AS category_name, u.username \
     FROM ads a JOIN categories c ON c.id = a.category_id JOIN users u ON u.id = a.user_id";

impl Category {
    pub async fn all(pool: &SqlitePool) -> Result<Vec<Category>, AppError> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories ORDER BY name")
                .fetch_all(pool)
                .await?,
        )
    }

    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Category>, AppError> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await?,
        )
    }

    pub async fn get_or_create(pool: &SqlitePool, name: &str) -> Result<Category, AppError> {
        sqlx::query("INSERT OR IGNORE INTO categories (name, description) VALUES (?, '')")
            .bind(name)
            .execute(pool)
            .await?;
        Ok(
            sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories WHERE name = ?")
                .bind(name)
                .fetch_one(pool)
                .await?,
        )
    }

    pub async fn active_ads_count(&self, pool: &SqlitePool) -> Result<i64, AppError> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM ads WHERE category_id = ? AND is_active = 1")
                .bind(self.id)
                .fetch_one(pool)
                .await?,
        )
    }
}

impl Ad {
    /// The first hundred characters of the description.
    pub fn short_description(&self) -> String {
        self.description.chars().take(SHORT_DESCRIPTION_LEN).collect()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.created_at + Duration::days(AD_LIFETIME_DAYS) < now
    }

    pub async fn create(pool: &SqlitePool, new_ad: &NewAd) -> Result<Ad, AppError> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO ads (title, title_search, description, description_search, price,
                              created_at, updated_at, is_active, user_id, category_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&new_ad.title)
        .bind(search_key(&new_ad.title))
        .bind(&new_ad.description)
        .bind(search_key(&new_ad.description))
        .bind(new_ad.price)
        .bind(now)
        .bind(now)
        .bind(new_ad.user_id)
        .bind(new_ad.category_id)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Self::find(pool, id).await
    }

    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Ad, AppError> {
        let sql = format!("{} WHERE a.id = ?", AD_SELECT);
        sqlx::query_as::<_, Ad>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Ad not found".into()))
    }

    fn push_active_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &AdFilter) {
        builder.push(" WHERE a.is_active = 1");
        if let Some(pattern) = filter.search.as_deref().and_then(folded_pattern) {
            builder
                .push(" AND (a.title_search LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR a.description_search LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        if let Some(category_id) = filter.category_id {
            builder.push(" AND a.category_id = ").push_bind(category_id);
        }
        if let Some(min) = filter.min_price {
            builder.push(" AND a.price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            builder.push(" AND a.price <= ").push_bind(max);
        }
    }

    pub async fn count_active(pool: &SqlitePool, filter: &AdFilter) -> Result<u64, AppError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM ads a");
        Self::push_active_filter(&mut builder, filter);
        let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
        Ok(count.max(0) as u64)
    }

    /// Active ads matching `filter`, newest first, limited to `page`.
    pub async fn list_active(
        pool: &SqlitePool,
        filter: &AdFilter,
        page: &Pagination,
    ) -> Result<Vec<Ad>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(AD_SELECT);
        Self::push_active_filter(&mut builder, filter);
        builder
            .push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        Ok(builder.build_query_as::<Ad>().fetch_all(pool).await?)
    }

    pub async fn for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Ad>, AppError> {
        let sql = format!("{} WHERE a.user_id = ? ORDER BY a.created_at DESC, a.id DESC", AD_SELECT);
        Ok(sqlx::query_as::<_, Ad>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await?)
    }

    /// Marks every active ad older than the ad lifetime as inactive.
    /// Returns how many ads were deactivated.
    pub async fn deactivate_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, AppError> {
        let cutoff = now - Duration::days(AD_LIFETIME_DAYS);
        let result = sqlx::query(
            "UPDATE ads SET is_active = 0, updated_at = ? WHERE is_active = 1 AND created_at < ?",
        )
        .bind(now)
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl Comment {
    pub async fn for_ad(pool: &SqlitePool, ad_id: i64) -> Result<Vec<Comment>, AppError> {
        Ok(sqlx::query_as::<_, Comment>(
            "SELECT c.id, c.content, c.created_at, c.ad_id, c.user_id, u.username
             FROM comments c JOIN users u ON u.id = c.user_id
             WHERE c.ad_id = ? ORDER BY c.created_at, c.id",
        )
        .bind(ad_id)
        .fetch_all(pool)
        .await?)
    }

    pub async fn create(
        pool: &SqlitePool,
        ad_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO comments (content, created_at, ad_id, user_id) VALUES (?, ?, ?, ?)")
            .bind(content)
            .bind(Utc::now())
            .bind(ad_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

impl BoardStatistics {
    pub async fn collect(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Self, AppError> {
        let last_month = now - Duration::days(AD_LIFETIME_DAYS);

        let ads_last_month: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ads WHERE created_at >= ?")
            .bind(last_month)
            .fetch_one(pool)
            .await?;
        let active_ads: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ads WHERE is_active = 1")
            .fetch_one(pool)
            .await?;
        let inactive_ads: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ads WHERE is_active = 0")
            .fetch_one(pool)
            .await?;
        let comments_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(pool)
            .await?;
        let category_stats = sqlx::query_as::<_, CategoryStat>(
            "SELECT c.name AS name,
                    COUNT(a.id) AS num_ads,
                    COALESCE(SUM(CASE WHEN a.is_active = 1 THEN 1 ELSE 0 END), 0) AS active_ads
             FROM categories c LEFT JOIN ads a ON a.category_id = c.id
             GROUP BY c.id, c.name
             ORDER BY c.name",
        )
        .fetch_all(pool)
        .await?;

        Ok(Self {
            ads_last_month,
            active_ads,
            inactive_ads,
            comments_count,
            category_stats,
        })
    }
}
