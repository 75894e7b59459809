//! Product repository.
//!
//! Handles submission intake, moderation transitions and sale verification.

use super::DbError;
use sqlx::SqlitePool;

/// Moderation state of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    /// Waiting for a moderator.
    Submitted,
    /// Public in the catalog.
    Live,
    /// Turned down by a moderator.
    Rejected,
}

impl ProductStatus {
    /// Column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Live => "live",
            Self::Rejected => "rejected",
        }
    }

    fn parse(value: &str) -> Result<Self, DbError> {
        match value {
            "submitted" => Ok(Self::Submitted),
            "live" => Ok(Self::Live),
            "rejected" => Ok(Self::Rejected),
            other => Err(DbError::CorruptRow(format!("unknown product status {other:?}"))),
        }
    }
}

/// Sale state of a listing, independent of moderation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleStatus {
    /// Still for sale.
    Available,
    /// The seller confirmed the sale through their capability link.
    SoldVerified,
}

impl SaleStatus {
    /// Column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::SoldVerified => "sold_verified",
        }
    }

    fn parse(value: &str) -> Result<Self, DbError> {
        match value {
            "available" => Ok(Self::Available),
            "sold_verified" => Ok(Self::SoldVerified),
            other => Err(DbError::CorruptRow(format!("unknown sale status {other:?}"))),
        }
    }
}

/// A listing.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub location: Option<String>,
    pub submitter_email: String,
    pub status: ProductStatus,
    pub sale_status: SaleStatus,
    pub sale_comment: Option<String>,
    pub sold_at: Option<i64>,
    pub rejection_reason: Option<String>,
    pub created_at: i64,
    pub approved_at: Option<i64>,
}

/// Fields supplied by a seller when proposing a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub location: Option<String>,
    pub submitter_email: String,
}

type ProductRow = (
    i64,
    String,
    String,
    i64,
    Option<String>,
    String,
    String,
    String,
    Option<String>,
    Option<i64>,
    Option<String>,
    i64,
    Option<i64>,
);

const PRODUCT_COLUMNS: &str = "id, title, description, price_cents, location, submitter_email, \
     status, sale_status, sale_comment, sold_at, rejection_reason, created_at, approved_at";

impl Product {
    fn from_row(row: ProductRow) -> Result<Self, DbError> {
        let (
            id,
            title,
            description,
            price_cents,
            location,
            submitter_email,
            status,
            sale_status,
            sale_comment,
            sold_at,
            rejection_reason,
            created_at,
            approved_at,
        ) = row;

        Ok(Self {
            id,
            title,
            description,
            price_cents,
            location,
            submitter_email,
            status: ProductStatus::parse(&status)?,
            sale_status: SaleStatus::parse(&sale_status)?,
            sale_comment,
            sold_at,
            rejection_reason,
            created_at,
            approved_at,
        })
    }
}

/// Repository for product operations.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new submission awaiting moderation.
    pub async fn create_submission(&self, submission: &NewSubmission) -> Result<Product, DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO products (title, description, price_cents, location, submitter_email, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&submission.title)
        .bind(&submission.description)
        .bind(submission.price_cents)
        .bind(submission.location.as_deref())
        .bind(&submission.submitter_email)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(Product {
            id: result.last_insert_rowid(),
            title: submission.title.clone(),
            description: submission.description.clone(),
            price_cents: submission.price_cents,
            location: submission.location.clone(),
            submitter_email: submission.submitter_email.clone(),
            status: ProductStatus::Submitted,
            sale_status: SaleStatus::Available,
            sale_comment: None,
            sold_at: None,
            rejection_reason: None,
            created_at: now,
            approved_at: None,
        })
    }

    /// Find a product by id, whatever its state.
    pub async fn find(&self, id: i64) -> Result<Option<Product>, DbError> {
        let query = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
        let row = sqlx::query_as::<_, ProductRow>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(Product::from_row).transpose()
    }

    /// Find a product only if it is publicly visible.
    pub async fn find_live(&self, id: i64) -> Result<Option<Product>, DbError> {
        let query = format!(
            "SELECT {} FROM products WHERE id = ? AND status = 'live'",
            PRODUCT_COLUMNS
        );
        let row = sqlx::query_as::<_, ProductRow>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(Product::from_row).transpose()
    }

    /// Live listings, newest first.
    pub async fn list_live(&self, limit: i64, offset: i64) -> Result<Vec<Product>, DbError> {
        let query = format!(
            r#"
            SELECT {} FROM products
            WHERE status = 'live'
            ORDER BY approved_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Product::from_row).collect()
    }

    /// All products in the given moderation state, oldest first.
    pub async fn list_by_status(&self, status: ProductStatus) -> Result<Vec<Product>, DbError> {
        let query = format!(
            "SELECT {} FROM products WHERE status = ? ORDER BY created_at ASC, id ASC",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&query)
            .bind(status.as_str())
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Product::from_row).collect()
    }

    /// Move a submission to live. Returns `false` if it was not `submitted`.
    pub async fn approve(&self, id: i64) -> Result<bool, DbError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE products SET status = 'live', approved_at = ? WHERE id = ? AND status = 'submitted'",
        )
        .bind(now)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Turn a submission down. Returns `false` if it was not `submitted`.
    pub async fn reject(&self, id: i64, reason: Option<&str>) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE products SET status = 'rejected', rejection_reason = ? WHERE id = ? AND status = 'submitted'",
        )
        .bind(reason)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a verified sale. Returns `false` unless the product was live
    /// and still available, so a repeated confirmation changes nothing.
    pub async fn mark_sold(
        &self,
        id: i64,
        comment: Option<&str>,
        sold_at: i64,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET sale_status = 'sold_verified', sale_comment = ?, sold_at = ?
            WHERE id = ? AND status = 'live' AND sale_status = 'available'
            "#,
        )
        .bind(comment)
        .bind(sold_at)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a product outright.
    pub async fn delete(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
