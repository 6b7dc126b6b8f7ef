//! Ticket store adapter.
//!
//! The reconciliation engine never touches a database directly. It talks to a
//! [`TicketStore`], whose one non-trivial obligation is that [`TicketStore::mark_paid`]
//! is a compare-and-swap: of any number of concurrent callers for the same
//! reference, exactly one observes [`PaidTransition::Transitioned`].

pub mod memory;
pub mod postgres;

pub use memory::InMemoryTicketStore;
pub use postgres::PostgresTicketStore;

use crate::types::{EventId, EventRecord, PaidTransition, Reference, Reservation};
use futures::future::BoxFuture;
use thiserror::Error;

/// Store result
pub type StoreResult<T> = Result<T, StoreError>;

/// Ticket store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A reservation with this reference already exists
    #[error("reservation {0} already exists")]
    AlreadyExists(Reference),
    /// No record under this key
    #[error("{0} not found")]
    NotFound(String),
    /// The backend failed (connection, query, corrupt row)
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Persistence for reservations and event sold-counts.
pub trait TicketStore: Send + Sync {
    /// Insert a new reservation.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyExists`] if the reference is taken; the existing
    /// record is left untouched.
    fn create_reservation<'a>(
        &'a self,
        reservation: &'a Reservation,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Fetch a reservation by reference.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such reservation exists.
    fn get_reservation<'a>(
        &'a self,
        reference: &'a Reference,
    ) -> BoxFuture<'a, StoreResult<Reservation>>;

    /// Set `status = paid` where `status = pending`.
    ///
    /// Repeating the call on a paid reservation returns
    /// [`PaidTransition::AlreadyPaid`] and changes nothing.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such reservation exists.
    fn mark_paid<'a>(
        &'a self,
        reference: &'a Reference,
    ) -> BoxFuture<'a, StoreResult<PaidTransition>>;

    /// Atomically add `delta` to the event's sold-ticket counter, creating the
    /// counter at `delta` when the event has no record yet.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] if the write fails.
    fn increment_sold_count<'a>(
        &'a self,
        event_id: &'a EventId,
        delta: u32,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Fetch an event record.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the event has no record.
    fn get_event<'a>(&'a self, event_id: &'a EventId) -> BoxFuture<'a, StoreResult<EventRecord>>;
}
