//! Deletion request repository.
//!
//! A product has at most one pending request at a time. Opening a second one
//! is a no-op, enforced by a partial unique index rather than a prior read.

use super::{DbError, Product};
use sqlx::SqlitePool;

/// How the requester proved ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    /// A signed capability link.
    Token,
    /// Product id plus the submitter's email address.
    Legacy,
}

impl RequestOrigin {
    /// Column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Legacy => "legacy",
        }
    }

    fn parse(value: &str) -> Result<Self, DbError> {
        match value {
            "token" => Ok(Self::Token),
            "legacy" => Ok(Self::Legacy),
            other => Err(DbError::CorruptRow(format!("unknown request origin {other:?}"))),
        }
    }
}

/// Resolution state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    /// Column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    fn parse(value: &str) -> Result<Self, DbError> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(DbError::CorruptRow(format!("unknown request status {other:?}"))),
        }
    }
}

/// An owner's request to remove a listing.
#[derive(Debug, Clone)]
pub struct DeletionRequest {
    pub id: i64,
    pub product_id: i64,
    pub product_title: String,
    pub submitter_email: String,
    pub reason: Option<String>,
    pub origin: RequestOrigin,
    pub status: RequestStatus,
    pub created_at: i64,
    pub resolved_at: Option<i64>,
}

type RequestRow = (
    i64,
    i64,
    String,
    String,
    Option<String>,
    String,
    String,
    i64,
    Option<i64>,
);

const REQUEST_COLUMNS: &str = "id, product_id, product_title, submitter_email, reason, origin, \
     status, created_at, resolved_at";

impl DeletionRequest {
    fn from_row(row: RequestRow) -> Result<Self, DbError> {
        let (
            id,
            product_id,
            product_title,
            submitter_email,
            reason,
            origin,
            status,
            created_at,
            resolved_at,
        ) = row;

        Ok(Self {
            id,
            product_id,
            product_title,
            submitter_email,
            reason,
            origin: RequestOrigin::parse(&origin)?,
            status: RequestStatus::parse(&status)?,
            created_at,
            resolved_at,
        })
    }
}

/// Repository for deletion request operations.
pub struct DeletionRequestRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DeletionRequestRepository<'a> {
    /// Create a new deletion request repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pending request for `product`.
    ///
    /// Returns `None` when one is already pending (the existing request is
    /// left untouched) or when the product is no longer live. Both are
    /// checked by the insert itself.
    pub async fn open(
        &self,
        product: &Product,
        reason: Option<&str>,
        origin: RequestOrigin,
    ) -> Result<Option<DeletionRequest>, DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO deletion_requests
                (product_id, product_title, submitter_email, reason, origin, status, created_at)
            SELECT id, title, submitter_email, ?, ?, 'pending', ?
            FROM products
            WHERE id = ? AND status = 'live'
            "#,
        )
        .bind(reason)
        .bind(origin.as_str())
        .bind(now)
        .bind(product.id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(DeletionRequest {
            id: result.last_insert_rowid(),
            product_id: product.id,
            product_title: product.title.clone(),
            submitter_email: product.submitter_email.clone(),
            reason: reason.map(String::from),
            origin,
            status: RequestStatus::Pending,
            created_at: now,
            resolved_at: None,
        }))
    }

    /// Find a request by id.
    pub async fn find(&self, id: i64) -> Result<Option<DeletionRequest>, DbError> {
        let query = format!("SELECT {} FROM deletion_requests WHERE id = ?", REQUEST_COLUMNS);
        let row = sqlx::query_as::<_, RequestRow>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(DeletionRequest::from_row).transpose()
    }

    /// The open request for a product, if any.
    pub async fn find_pending(&self, product_id: i64) -> Result<Option<DeletionRequest>, DbError> {
        let query = format!(
            "SELECT {} FROM deletion_requests WHERE product_id = ? AND status = 'pending'",
            REQUEST_COLUMNS
        );
        let row = sqlx::query_as::<_, RequestRow>(&query)
            .bind(product_id)
            .fetch_optional(self.pool)
            .await?;

        row.map(DeletionRequest::from_row).transpose()
    }

    /// All pending requests, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<DeletionRequest>, DbError> {
        let query = format!(
            "SELECT {} FROM deletion_requests WHERE status = 'pending' ORDER BY created_at ASC, id ASC",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query_as::<_, RequestRow>(&query)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(DeletionRequest::from_row).collect()
    }

    /// Approve a pending request and delete its product in one transaction.
    ///
    /// Returns the resolved request, or `None` if it was not pending.
    pub async fn approve(&self, id: i64) -> Result<Option<DeletionRequest>, DbError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE deletion_requests SET status = 'approved', resolved_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let query = format!("SELECT {} FROM deletion_requests WHERE id = ?", REQUEST_COLUMNS);
        let row = sqlx::query_as::<_, RequestRow>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let request = DeletionRequest::from_row(row)?;

        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(request.product_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(request))
    }

    /// Reject a pending request, leaving the product live.
    ///
    /// Returns the resolved request, or `None` if it was not pending.
    pub async fn reject(&self, id: i64) -> Result<Option<DeletionRequest>, DbError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE deletion_requests SET status = 'rejected', resolved_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(now)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find(id).await
    }
}
