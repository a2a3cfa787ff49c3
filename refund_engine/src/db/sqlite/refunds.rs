use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{FileId, NewRefund, Refund, RefundStats, RefundStatus},
};

/// Inserts a new pending refund. A unique-constraint violation on `file_id` is reported as
/// [`SqliteDatabaseError::DuplicateFileId`].
pub async fn insert_refund(
    refund: NewRefund,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Refund, SqliteDatabaseError> {
    let file_id = refund.file_id.clone();
    let result = sqlx::query_as::<_, Refund>(
        r#"
            INSERT INTO refunds (
                file_id,
                status,
                user_id,
                year,
                refund_amount,
                eta,
                created_at,
                updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING
                id, file_id, status, error_message, user_id, year, refund_amount, eta,
                created_at, updated_at, processed_at;
        "#,
    )
    .bind(refund.file_id)
    .bind(RefundStatus::Pending)
    .bind(refund.user_id)
    .bind(refund.year)
    .bind(refund.refund_amount)
    .bind(refund.eta)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(refund) => {
            trace!("🗃️ Refund {} inserted with id {}", refund.file_id, refund.id);
            Ok(refund)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(SqliteDatabaseError::DuplicateFileId(file_id)),
        Err(e) => Err(e.into()),
    }
}

/// Returns the refund for the given `file_id`, or `None` if it does not exist.
pub async fn fetch_refund_by_file_id(
    file_id: &FileId,
    conn: &mut SqliteConnection,
) -> Result<Option<Refund>, SqliteDatabaseError> {
    let refund = sqlx::query_as::<_, Refund>(
        r#"
            SELECT
                id, file_id, status, error_message, user_id, year, refund_amount, eta,
                created_at, updated_at, processed_at
            FROM refunds
            WHERE file_id = ?
            LIMIT 1;
        "#,
    )
    .bind(file_id)
    .fetch_optional(conn)
    .await?;
    Ok(refund)
}

/// Fetches up to `limit` pending refunds with an id greater than `after_id`, in id order.
pub async fn fetch_pending(
    after_id: i64,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Refund>, SqliteDatabaseError> {
    let refunds = sqlx::query_as::<_, Refund>(
        r#"
            SELECT
                id, file_id, status, error_message, user_id, year, refund_amount, eta,
                created_at, updated_at, processed_at
            FROM refunds
            WHERE status = ? AND id > ?
            ORDER BY id ASC
            LIMIT ?;
        "#,
    )
    .bind(RefundStatus::Pending)
    .bind(after_id)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    trace!("🗃️ Fetched {} pending refunds after id {after_id}", refunds.len());
    Ok(refunds)
}

/// Writes the status fields of `refund` to the row with the same id.
pub async fn update_status(
    refund: &Refund,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Refund, SqliteDatabaseError> {
    let processed_at = match refund.status {
        RefundStatus::Processed => refund.processed_at.or(Some(now)),
        RefundStatus::Pending | RefundStatus::Error => None,
    };
    let error_message = match refund.status {
        RefundStatus::Error => refund.error_message.clone(),
        RefundStatus::Pending | RefundStatus::Processed => None,
    };
    let updated = sqlx::query_as::<_, Refund>(
        r#"
            UPDATE refunds
            SET status = ?, error_message = ?, processed_at = ?, updated_at = ?
            WHERE id = ?
            RETURNING
                id, file_id, status, error_message, user_id, year, refund_amount, eta,
                created_at, updated_at, processed_at;
        "#,
    )
    .bind(refund.status)
    .bind(error_message)
    .bind(processed_at)
    .bind(now)
    .bind(refund.id)
    .fetch_optional(conn)
    .await?
    .ok_or(SqliteDatabaseError::RefundNotFound(refund.id))?;
    debug!("🗃️ Refund {} [{}] is now {}", updated.file_id, updated.id, updated.status);
    Ok(updated)
}

pub async fn refund_stats(conn: &mut SqliteConnection) -> Result<RefundStats, SqliteDatabaseError> {
    let stats = sqlx::query_as::<_, RefundStats>(
        r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN status = 'processed' THEN 1 ELSE 0 END), 0) AS processed,
                COALESCE(SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END), 0) AS error
            FROM refunds;
        "#,
    )
    .fetch_one(conn)
    .await?;
    Ok(stats)
}
