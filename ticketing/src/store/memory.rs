//! In-memory ticket store.
//!
//! Used by the development server and by tests. All mutations happen under a
//! single write lock, which makes `mark_paid` and `increment_sold_count`
//! atomic within the process.

use super::{StoreError, StoreResult, TicketStore};
use crate::types::{EventId, EventRecord, PaidTransition, Reference, Reservation, ReservationStatus};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// In-memory [`TicketStore`] with failure injection for tests.
#[derive(Clone, Default)]
pub struct InMemoryTicketStore {
    reservations: Arc<RwLock<HashMap<Reference, Reservation>>>,
    events: Arc<RwLock<HashMap<EventId, EventRecord>>>,
    faults: Arc<Faults>,
}

#[derive(Default)]
struct Faults {
    writes: AtomicBool,
    reservation_reads: AtomicBool,
    increments: AtomicBool,
    event_reads: AtomicBool,
}

impl InMemoryTicketStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event record.
    pub async fn insert_event(&self, event: EventRecord) {
        self.events.write().await.insert(event.id.clone(), event);
    }

    /// Number of stored reservations
    pub async fn reservation_count(&self) -> usize {
        self.reservations.read().await.len()
    }

    /// Make `create_reservation` and `mark_paid` fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.faults.writes.store(fail, Ordering::SeqCst);
    }

    /// Make `get_reservation` fail with a backend error.
    pub fn fail_reservation_reads(&self, fail: bool) {
        self.faults.reservation_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `increment_sold_count` fail with a backend error.
    pub fn fail_increments(&self, fail: bool) {
        self.faults.increments.store(fail, Ordering::SeqCst);
    }

    /// Make `get_event` fail with a backend error.
    pub fn fail_event_reads(&self, fail: bool) {
        self.faults.event_reads.store(fail, Ordering::SeqCst);
    }

    fn injected(flag: &AtomicBool, operation: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Backend(format!("injected {operation} failure")))
        } else {
            Ok(())
        }
    }
}

impl TicketStore for InMemoryTicketStore {
    fn create_reservation<'a>(
        &'a self,
        reservation: &'a Reservation,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            Self::injected(&self.faults.writes, "create")?;

            let mut reservations = self.reservations.write().await;
            if reservations.contains_key(&reservation.reference) {
                return Err(StoreError::AlreadyExists(reservation.reference.clone()));
            }
            reservations.insert(reservation.reference.clone(), reservation.clone());
            Ok(())
        })
    }

    fn get_reservation<'a>(
        &'a self,
        reference: &'a Reference,
    ) -> BoxFuture<'a, StoreResult<Reservation>> {
        Box::pin(async move {
            Self::injected(&self.faults.reservation_reads, "read")?;

            self.reservations
                .read()
                .await
                .get(reference)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("reservation {reference}")))
        })
    }

    fn mark_paid<'a>(
        &'a self,
        reference: &'a Reference,
    ) -> BoxFuture<'a, StoreResult<PaidTransition>> {
        Box::pin(async move {
            Self::injected(&self.faults.writes, "mark paid")?;

            let mut reservations = self.reservations.write().await;
            let reservation = reservations
                .get_mut(reference)
                .ok_or_else(|| StoreError::NotFound(format!("reservation {reference}")))?;

            match reservation.status {
                ReservationStatus::Paid => Ok(PaidTransition::AlreadyPaid),
                ReservationStatus::Pending => {
                    reservation.status = ReservationStatus::Paid;
                    Ok(PaidTransition::Transitioned)
                },
            }
        })
    }

    fn increment_sold_count<'a>(
        &'a self,
        event_id: &'a EventId,
        delta: u32,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            Self::injected(&self.faults.increments, "increment")?;

            let mut events = self.events.write().await;
            let record = events.entry(event_id.clone()).or_insert_with(|| EventRecord {
                id: event_id.clone(),
                title: None,
                starts_at: None,
                sold_tickets: 0,
            });
            record.sold_tickets = record.sold_tickets.saturating_add(u64::from(delta));
            Ok(())
        })
    }

    fn get_event<'a>(&'a self, event_id: &'a EventId) -> BoxFuture<'a, StoreResult<EventRecord>> {
        Box::pin(async move {
            Self::injected(&self.faults.event_reads, "event read")?;

            self.events
                .read()
                .await
                .get(event_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))
        })
    }
}
