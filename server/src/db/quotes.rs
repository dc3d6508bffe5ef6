//! Database operations for the quotes table.

use quotesync_engine::{Quote, Timestamp};
use sqlx::{PgPool, Row};

/// A stored quote row from the database.
#[derive(Debug)]
pub struct StoredQuote {
    pub id: String,
    pub text: String,
    pub category: String,
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredQuote {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredQuote {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            category: row.try_get("category")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StoredQuote {
    /// Convert database row to an engine Quote.
    pub fn into_quote(self) -> Quote {
        Quote::new(
            self.id,
            self.text,
            self.category,
            u64::try_from(self.updated_at).unwrap_or(0),
        )
    }
}

/// Every quote, in insertion order.
pub async fn fetch_quotes(pool: &PgPool) -> Result<Vec<StoredQuote>, sqlx::Error> {
    sqlx::query_as::<_, StoredQuote>(
        r#"
        SELECT id, text, category, updated_at
        FROM quotes
        ORDER BY seq ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Replace-or-insert each quote by id, in order, in one transaction.
///
/// A later entry for the same id overwrites an earlier one; existing rows
/// keep their position.
pub async fn upsert_quotes(pool: &PgPool, quotes: &[Quote]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for quote in quotes {
        sqlx::query(
            r#"
            INSERT INTO quotes (id, text, category, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                text = EXCLUDED.text,
                category = EXCLUDED.category,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&quote.id)
        .bind(&quote.text)
        .bind(&quote.category)
        .bind(timestamp_column(quote.updated_at))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// Insert the demo quotes if the table is empty. Returns how many were
/// inserted.
pub async fn seed_demo_quotes(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM quotes")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(0);
    }

    let demo = [
        Quote::new(
            "srv-1",
            "Stay hungry, stay foolish.",
            "Inspiration",
            now.saturating_sub(60_000),
        ),
        Quote::new(
            "srv-2",
            "Simplicity is the soul of efficiency.",
            "Productivity",
            now.saturating_sub(45_000),
        ),
    ];
    upsert_quotes(pool, &demo).await?;

    Ok(demo.len() as u64)
}

/// Clamp a timestamp into the BIGINT column range.
pub fn timestamp_column(updated_at: Timestamp) -> i64 {
    i64::try_from(updated_at).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_conversion() {
        let stored = StoredQuote {
            id: "a".into(),
            text: "A".into(),
            category: "C".into(),
            updated_at: 42,
        };
        assert_eq!(stored.into_quote(), Quote::new("a", "A", "C", 42));
    }

    #[test]
    fn test_negative_timestamp_reads_as_zero() {
        let stored = StoredQuote {
            id: "a".into(),
            text: "A".into(),
            category: "C".into(),
            updated_at: -5,
        };
        assert_eq!(stored.into_quote().updated_at, 0);
    }

    #[test]
    fn test_timestamp_column_clamps() {
        assert_eq!(timestamp_column(7), 7);
        assert_eq!(timestamp_column(u64::MAX), i64::MAX);
    }
}
