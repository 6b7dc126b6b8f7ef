//! `PostgreSQL` ticket store.
//!
//! The `pending → paid` transition is a single conditional `UPDATE`, so the
//! database decides which concurrent caller observes the transition.

use super::{StoreError, StoreResult, TicketStore};
use crate::types::{
    EventId, EventRecord, Money, PaidTransition, Reference, Reservation, ReservationStatus,
};
use futures::future::BoxFuture;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;

/// `PostgreSQL`-backed [`TicketStore`].
#[derive(Clone)]
pub struct PostgresTicketStore {
    pool: Arc<PgPool>,
}

impl PostgresTicketStore {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Connects a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the database is unreachable.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect: {e}")))?;

        Ok(Self::new(Arc::new(pool)))
    }

    /// Creates the tables if they do not exist. Safe to run on every start.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if a statement fails.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ticket_reservations (
                reference TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                event_title TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT,
                quantity INTEGER NOT NULL CHECK (quantity > 0),
                amount BIGINT NOT NULL CHECK (amount >= 0),
                status TEXT NOT NULL CHECK (status IN ('pending', 'paid')),
                created_at TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StoreError::Backend(format!("Failed to create ticket_reservations: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ticket_events (
                id TEXT PRIMARY KEY,
                title TEXT,
                starts_at TIMESTAMPTZ,
                sold_tickets BIGINT NOT NULL DEFAULT 0
            )
            ",
        )
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StoreError::Backend(format!("Failed to create ticket_events: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_ticket_reservations_event \
             ON ticket_reservations (event_id)",
        )
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StoreError::Backend(format!("Failed to create index: {e}")))?;

        Ok(())
    }

    /// Insert or replace an event's catalog fields, keeping its sold count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the write fails.
    pub async fn upsert_event(&self, event: &EventRecord) -> StoreResult<()> {
        let sold = i64::try_from(event.sold_tickets)
            .map_err(|_| StoreError::Backend("sold_tickets out of range".to_string()))?;

        sqlx::query(
            r"
            INSERT INTO ticket_events (id, title, starts_at, sold_tickets)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title, starts_at = EXCLUDED.starts_at
            ",
        )
        .bind(event.id.as_str())
        .bind(event.title.as_deref())
        .bind(event.starts_at)
        .bind(sold)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StoreError::Backend(format!("Failed to upsert event: {e}")))?;

        Ok(())
    }

    fn reservation_from_row(row: &PgRow) -> StoreResult<Reservation> {
        let decode =
            |e: sqlx::Error| StoreError::Backend(format!("Failed to decode reservation: {e}"));

        let reference: String = row.try_get("reference").map_err(decode)?;
        let event_id: String = row.try_get("event_id").map_err(decode)?;
        let quantity: i32 = row.try_get("quantity").map_err(decode)?;
        let amount: i64 = row.try_get("amount").map_err(decode)?;
        let status: String = row.try_get("status").map_err(decode)?;

        Ok(Reservation {
            reference: Reference::parse(&reference)
                .ok_or_else(|| StoreError::Backend("blank reference in row".to_string()))?,
            event_id: EventId::parse(&event_id)
                .ok_or_else(|| StoreError::Backend("blank event_id in row".to_string()))?,
            event_title: row.try_get("event_title").map_err(decode)?,
            name: row.try_get("name").map_err(decode)?,
            email: row.try_get("email").map_err(decode)?,
            phone: row.try_get("phone").map_err(decode)?,
            quantity: u32::try_from(quantity)
                .map_err(|_| StoreError::Backend(format!("invalid quantity {quantity}")))?,
            amount: Money::from_minor(
                u64::try_from(amount)
                    .map_err(|_| StoreError::Backend(format!("invalid amount {amount}")))?,
            ),
            status: ReservationStatus::parse(&status)
                .ok_or_else(|| StoreError::Backend(format!("invalid status '{status}'")))?,
            created_at: row.try_get("created_at").map_err(decode)?,
        })
    }
}

impl TicketStore for PostgresTicketStore {
    fn create_reservation<'a>(
        &'a self,
        reservation: &'a Reservation,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let quantity = i32::try_from(reservation.quantity)
                .map_err(|_| StoreError::Backend("quantity out of range".to_string()))?;
            let amount = i64::try_from(reservation.amount.minor())
                .map_err(|_| StoreError::Backend("amount out of range".to_string()))?;

            let result = sqlx::query(
                r"
                INSERT INTO ticket_reservations
                    (reference, event_id, event_title, name, email, phone,
                     quantity, amount, status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (reference) DO NOTHING
                ",
            )
            .bind(reservation.reference.as_str())
            .bind(reservation.event_id.as_str())
            .bind(&reservation.event_title)
            .bind(&reservation.name)
            .bind(&reservation.email)
            .bind(reservation.phone.as_deref())
            .bind(quantity)
            .bind(amount)
            .bind(reservation.status.as_str())
            .bind(reservation.created_at)
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to insert reservation: {e}")))?;

            if result.rows_affected() == 0 {
                return Err(StoreError::AlreadyExists(reservation.reference.clone()));
            }
            Ok(())
        })
    }

    fn get_reservation<'a>(
        &'a self,
        reference: &'a Reference,
    ) -> BoxFuture<'a, StoreResult<Reservation>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT * FROM ticket_reservations WHERE reference = $1")
                .bind(reference.as_str())
                .fetch_optional(self.pool.as_ref())
                .await
                .map_err(|e| StoreError::Backend(format!("Failed to query reservation: {e}")))?
                .ok_or_else(|| StoreError::NotFound(format!("reservation {reference}")))?;

            Self::reservation_from_row(&row)
        })
    }

    fn mark_paid<'a>(
        &'a self,
        reference: &'a Reference,
    ) -> BoxFuture<'a, StoreResult<PaidTransition>> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE ticket_reservations SET status = 'paid' \
                 WHERE reference = $1 AND status = 'pending'",
            )
            .bind(reference.as_str())
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to mark paid: {e}")))?;

            if result.rows_affected() == 1 {
                return Ok(PaidTransition::Transitioned);
            }

            // Status only ever moves forward, so an existing row here is paid.
            let exists: Option<(String,)> =
                sqlx::query_as("SELECT status FROM ticket_reservations WHERE reference = $1")
                    .bind(reference.as_str())
                    .fetch_optional(self.pool.as_ref())
                    .await
                    .map_err(|e| StoreError::Backend(format!("Failed to query reservation: {e}")))?;

            match exists {
                Some(_) => Ok(PaidTransition::AlreadyPaid),
                None => Err(StoreError::NotFound(format!("reservation {reference}"))),
            }
        })
    }

    fn increment_sold_count<'a>(
        &'a self,
        event_id: &'a EventId,
        delta: u32,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO ticket_events (id, sold_tickets)
                VALUES ($1, $2)
                ON CONFLICT (id) DO UPDATE
                SET sold_tickets = ticket_events.sold_tickets + EXCLUDED.sold_tickets
                ",
            )
            .bind(event_id.as_str())
            .bind(i64::from(delta))
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to increment sold count: {e}")))?;

            Ok(())
        })
    }

    fn get_event<'a>(&'a self, event_id: &'a EventId) -> BoxFuture<'a, StoreResult<EventRecord>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, title, starts_at, sold_tickets FROM ticket_events WHERE id = $1",
            )
            .bind(event_id.as_str())
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to query event: {e}")))?
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))?;

            let decode =
                |e: sqlx::Error| StoreError::Backend(format!("Failed to decode event: {e}"));
            let sold: i64 = row.try_get("sold_tickets").map_err(decode)?;

            Ok(EventRecord {
                id: event_id.clone(),
                title: row.try_get("title").map_err(decode)?,
                starts_at: row.try_get("starts_at").map_err(decode)?,
                sold_tickets: u64::try_from(sold)
                    .map_err(|_| StoreError::Backend(format!("invalid sold_tickets {sold}")))?,
            })
        })
    }
}
