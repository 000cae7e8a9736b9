//! PostgreSQL-backed reservation store.
//!
//! Inventory moves only through single conditional UPDATE statements, and
//! the `inventory >= 0` check constraint backs them up at the storage
//! layer. The reconciliation pass runs inside one transaction with the
//! session's ledger rows locked, so a concurrent expiry sweep and a
//! concurrent checkout can never both act on the same reservation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{CheckoutRef, SessionId, SessionToken, Sku};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::ledger::{
    CartLine, ReconcileOutcome, Reservation, ReservationStatus, Session, SweepOutcome,
};
use crate::store::ReservationStore;
use crate::{Result, StoreError};

/// PostgreSQL reservation store implementation.
#[derive(Clone)]
pub struct PostgresReservationStore {
    pool: PgPool,
}

fn map_inventory_error(sku: &Sku, e: sqlx::Error) -> StoreError {
    // The check constraint firing means the mutation would have taken
    // inventory negative, which callers treat the same as losing the race.
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some("product_sku_inventory_check")
    {
        return StoreError::InsufficientStock { sku: sku.clone() };
    }
    StoreError::Database(e)
}

async fn decrement_on(conn: &mut sqlx::PgConnection, sku: &Sku, qty: u32) -> Result<()> {
    let result = sqlx::query(
        "UPDATE product_sku SET inventory = inventory - $2 WHERE sku = $1 AND inventory >= $2",
    )
    .bind(sku.as_str())
    .bind(qty as i32)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_inventory_error(sku, e))?;

    if result.rows_affected() == 0 {
        return Err(StoreError::InsufficientStock { sku: sku.clone() });
    }
    Ok(())
}

async fn increment_on(conn: &mut sqlx::PgConnection, sku: &Sku, qty: u32) -> Result<()> {
    sqlx::query("UPDATE product_sku SET inventory = inventory + $2 WHERE sku = $1")
        .bind(sku.as_str())
        .bind(qty as i32)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_inventory_error(sku, e))?;
    Ok(())
}

impl PostgresReservationStore {
    /// Creates a new PostgreSQL reservation store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_reservation(row: PgRow) -> Result<Reservation> {
        let status: String = row.try_get("status")?;
        let status = ReservationStatus::parse(&status).ok_or_else(|| {
            StoreError::Database(sqlx::Error::Decode(
                format!("unknown reservation status {status}").into(),
            ))
        })?;

        Ok(Reservation {
            id: row.try_get("reservation_id")?,
            reference: CheckoutRef::new(row.try_get::<String, _>("reference")?),
            sku: Sku::new(row.try_get::<String, _>("sku")?),
            session_id: SessionId::new(row.try_get("session_id")?),
            qty: row.try_get::<i32, _>("qty")? as u32,
            status,
            expires_at: row.try_get("expires_at")?,
        })
    }

    fn row_to_session(row: PgRow) -> Result<Session> {
        Ok(Session {
            id: SessionId::new(row.try_get("session_id")?),
            token: SessionToken::new(row.try_get::<String, _>("token")?),
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }

    /// Claims one expired reservation, restocks it, and deletes the row.
    ///
    /// Returns false if the conditional claim affected no rows, meaning a
    /// concurrent coordinator refreshed the hold or another sweep got
    /// there first.
    async fn release_one_expired(&self, reservation_id: i64, now: DateTime<Utc>) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Single conditional flip away from PENDING: of a racing reaper
        // and coordinator, only one ever succeeds in claiming the row.
        let claimed: Option<(String, i32)> = sqlx::query_as(
            r#"
            UPDATE order_reservation
            SET status = 'EXPIRED'
            WHERE reservation_id = $1 AND status = 'PENDING' AND expires_at <= $2
            RETURNING sku, qty
            "#,
        )
        .bind(reservation_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((sku, qty)) = claimed else {
            return Ok(false);
        };

        let sku = Sku::new(sku);
        increment_on(&mut tx, &sku, qty as u32).await?;

        sqlx::query("DELETE FROM order_reservation WHERE reservation_id = $1")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl ReservationStore for PostgresReservationStore {
    async fn insert_sku(&self, sku: &Sku, inventory: u32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO product_sku (sku, inventory)
            VALUES ($1, $2)
            ON CONFLICT (sku) DO UPDATE SET inventory = EXCLUDED.inventory
            "#,
        )
        .bind(sku.as_str())
        .bind(inventory as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn available(&self, sku: &Sku) -> Result<Option<u32>> {
        let inventory: Option<i32> =
            sqlx::query_scalar("SELECT inventory FROM product_sku WHERE sku = $1")
                .bind(sku.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(inventory.map(|i| i as u32))
    }

    async fn decrement_available(&self, sku: &Sku, qty: u32) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        decrement_on(&mut conn, sku, qty).await
    }

    async fn increment_available(&self, sku: &Sku, qty: u32) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        increment_on(&mut conn, sku, qty).await
    }

    async fn session_by_token(&self, token: &SessionToken) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT session_id, token, created_at, expires_at FROM shopping_session WHERE token = $1",
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_session).transpose()
    }

    async fn upsert_cart_line(
        &self,
        token: &SessionToken,
        sku: &Sku,
        qty: u32,
        session_ttl: Duration,
    ) -> Result<Session> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO shopping_session (token, created_at, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token) DO NOTHING
            "#,
        )
        .bind(token.as_str())
        .bind(now)
        .bind(now + session_ttl)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(
            "SELECT session_id, token, created_at, expires_at FROM shopping_session WHERE token = $1",
        )
        .bind(token.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let session = Self::row_to_session(row)?;

        sqlx::query(
            r#"
            INSERT INTO cart_item (session_id, sku, qty)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT unique_session_sku
            DO UPDATE SET qty = EXCLUDED.qty
            "#,
        )
        .bind(session.id.as_i64())
        .bind(sku.as_str())
        .bind(qty as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(session)
    }

    async fn remove_cart_line(&self, token: &SessionToken, sku: &Sku) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM cart_item
            WHERE sku = $2
              AND session_id = (SELECT session_id FROM shopping_session WHERE token = $1)
            "#,
        )
        .bind(token.as_str())
        .bind(sku.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cart_lines(&self, session: SessionId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query("SELECT sku, qty FROM cart_item WHERE session_id = $1 ORDER BY sku")
            .bind(session.as_i64())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CartLine::new(
                    Sku::new(row.try_get::<String, _>("sku")?),
                    row.try_get::<i32, _>("qty")? as u32,
                ))
            })
            .collect()
    }

    async fn pending_reservations(
        &self,
        session: SessionId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            SELECT reservation_id, reference, sku, session_id, qty, status, expires_at
            FROM order_reservation
            WHERE session_id = $1 AND status = 'PENDING' AND expires_at > $2
            ORDER BY reservation_id
            "#,
        )
        .bind(session.as_i64())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn reconcile(
        &self,
        session: SessionId,
        cart: &[CartLine],
        reference: &CheckoutRef,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome> {
        let mut tx = self.pool.begin().await?;
        let mut outcome = ReconcileOutcome::default();

        // Re-read every PENDING hold for this session inside the
        // transaction, row-locked so the expiry sweep cannot claim them
        // mid-pass.
        let rows = sqlx::query(
            r#"
            SELECT reservation_id, sku, qty, expires_at
            FROM order_reservation
            WHERE session_id = $1 AND status = 'PENDING'
            FOR UPDATE
            "#,
        )
        .bind(session.as_i64())
        .fetch_all(&mut *tx)
        .await?;

        let mut held: HashMap<Sku, (i64, u32)> = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("reservation_id")?;
            let row_sku = Sku::new(row.try_get::<String, _>("sku")?);
            let qty = row.try_get::<i32, _>("qty")? as u32;
            let row_expiry: DateTime<Utc> = row.try_get("expires_at")?;

            if row_expiry > now {
                held.insert(row_sku, (id, qty));
            } else {
                // Expired but not yet swept: release it here exactly as
                // the sweep would, so the cart walk below starts from a
                // clean slate instead of inserting a duplicate hold.
                increment_on(&mut tx, &row_sku, qty).await?;
                sqlx::query("DELETE FROM order_reservation WHERE reservation_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                outcome.released += 1;
            }
        }

        for line in cart {
            match held.remove(&line.sku) {
                None => {
                    decrement_on(&mut tx, &line.sku, line.qty).await?;
                    sqlx::query(
                        r#"
                        INSERT INTO order_reservation (reference, sku, session_id, qty, status, expires_at)
                        VALUES ($1, $2, $3, $4, 'PENDING', $5)
                        "#,
                    )
                    .bind(reference.as_str())
                    .bind(line.sku.as_str())
                    .bind(session.as_i64())
                    .bind(line.qty as i32)
                    .bind(expires_at)
                    .execute(&mut *tx)
                    .await?;
                }
                Some((reservation_id, prior_qty)) => {
                    if line.qty > prior_qty {
                        decrement_on(&mut tx, &line.sku, line.qty - prior_qty).await?;
                    } else if line.qty < prior_qty {
                        increment_on(&mut tx, &line.sku, prior_qty - line.qty).await?;
                    }

                    let updated = sqlx::query(
                        r#"
                        UPDATE order_reservation
                        SET qty = $1, reference = $2, expires_at = $3
                        WHERE reservation_id = $4 AND status = 'PENDING'
                        "#,
                    )
                    .bind(line.qty as i32)
                    .bind(reference.as_str())
                    .bind(expires_at)
                    .bind(reservation_id)
                    .execute(&mut *tx)
                    .await?;

                    // The locked row can only vanish if something claimed it
                    // before we took the lock; treat it as a lost race.
                    if updated.rows_affected() == 0 {
                        return Err(StoreError::InsufficientStock {
                            sku: line.sku.clone(),
                        });
                    }
                }
            }
            outcome.reconciled += 1;
        }

        // Holds for SKUs no longer in the cart: restock and delete.
        for (sku, (reservation_id, qty)) in held {
            increment_on(&mut tx, &sku, qty).await?;
            sqlx::query("DELETE FROM order_reservation WHERE reservation_id = $1")
                .bind(reservation_id)
                .execute(&mut *tx)
                .await?;
            outcome.released += 1;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn confirm_reference(&self, reference: &CheckoutRef) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE order_reservation SET status = 'CONFIRMED' WHERE reference = $1 AND status = 'PENDING'",
        )
        .bind(reference.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn release_reference(&self, reference: &CheckoutRef) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<(i64, String, i32)> = sqlx::query_as(
            r#"
            SELECT reservation_id, sku, qty
            FROM order_reservation
            WHERE reference = $1 AND status = 'PENDING'
            FOR UPDATE
            "#,
        )
        .bind(reference.as_str())
        .fetch_all(&mut *tx)
        .await?;

        let mut released = 0;
        for (reservation_id, sku, qty) in rows {
            let sku = Sku::new(sku);
            increment_on(&mut tx, &sku, qty as u32).await?;
            sqlx::query("DELETE FROM order_reservation WHERE reservation_id = $1")
                .bind(reservation_id)
                .execute(&mut *tx)
                .await?;
            released += 1;
        }

        tx.commit().await?;
        Ok(released)
    }

    async fn release_expired(&self, now: DateTime<Utc>) -> Result<SweepOutcome> {
        let candidates: Vec<i64> = sqlx::query_scalar(
            "SELECT reservation_id FROM order_reservation WHERE status = 'PENDING' AND expires_at <= $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut outcome = SweepOutcome::default();
        for reservation_id in candidates {
            match self.release_one_expired(reservation_id, now).await {
                Ok(true) => outcome.released += 1,
                Ok(false) => {} // claimed elsewhere; nothing to do
                Err(e) => {
                    // One stuck row must not block releasing the others.
                    tracing::warn!(reservation_id, error = %e, "failed to release expired reservation");
                    outcome.failed += 1;
                }
            }
        }
        Ok(outcome)
    }
}
