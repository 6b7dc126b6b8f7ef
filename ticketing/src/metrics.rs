//! Business metrics for ticket sales and payment reconciliation.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `ticketing_reservations_issued_total` - Pending reservations created
//! - `ticketing_reservation_issue_failures_total{reason}` - Failed issue attempts
//! - `ticketing_reconciliations_total{path,outcome}` - Verify and webhook outcomes
//! - `ticketing_tickets_sold_total` - Tickets that reached `paid`
//! - `ticketing_payment_revenue_minor_total` - Revenue in minor units
//! - `ticketing_side_effect_failures_total{kind}` - Counter/email failures
//! - `ticketing_webhooks_rejected_total{reason}` - Webhooks refused before processing
//! - `ticketing_confirmations_sent_total` - Confirmation emails delivered
//!
//! ## Histograms
//! - `ticketing_gateway_duration_seconds{operation}` - Gateway round-trip time

use metrics::{describe_counter, describe_histogram};
use std::time::Duration;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "ticketing_reservations_issued_total",
        "Total number of pending reservations created after the gateway accepted the charge"
    );
    describe_counter!(
        "ticketing_reservation_issue_failures_total",
        "Total number of failed reservation attempts by reason"
    );
    describe_counter!(
        "ticketing_reconciliations_total",
        "Total number of reconciliation runs by entry path and outcome"
    );
    describe_counter!("ticketing_tickets_sold_total", "Total number of tickets that reached paid");
    describe_counter!(
        "ticketing_payment_revenue_minor_total",
        "Total revenue from confirmed payments in minor currency units"
    );
    describe_counter!(
        "ticketing_side_effect_failures_total",
        "Total number of best-effort side effects that failed (sold_count, email)"
    );
    describe_counter!(
        "ticketing_webhooks_rejected_total",
        "Total number of webhooks refused before processing (signature, payload)"
    );
    describe_counter!(
        "ticketing_confirmations_sent_total",
        "Total number of confirmation emails delivered"
    );
    describe_histogram!(
        "ticketing_gateway_duration_seconds",
        "Time taken by a payment gateway call"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Recording
// ============================================================================

/// Record a pending reservation created.
pub fn record_reservation_issued(quantity: u32) {
    metrics::counter!("ticketing_reservations_issued_total").increment(1);
    tracing::debug!(quantity, "Recorded reservation_issued metric");
}

/// Record a failed issue attempt.
///
/// # Arguments
///
/// * `reason` - `validation`, `gateway`, `conflict` or `store`
pub fn record_reservation_issue_failed(reason: &'static str) {
    metrics::counter!("ticketing_reservation_issue_failures_total", "reason" => reason)
        .increment(1);
    tracing::debug!(reason, "Recorded reservation_issue_failed metric");
}

/// Record the outcome of one reconciliation run.
///
/// # Arguments
///
/// * `path` - `verify` or `webhook`
/// * `outcome` - e.g. `transitioned`, `already_paid`, `ignored`, `failed`
pub fn record_reconciliation(path: &'static str, outcome: &'static str) {
    metrics::counter!("ticketing_reconciliations_total", "path" => path, "outcome" => outcome)
        .increment(1);
    tracing::debug!(path, outcome, "Recorded reconciliation metric");
}

/// Record tickets confirmed by an observed `pending → paid` transition.
pub fn record_tickets_sold(quantity: u32, amount_minor: u64) {
    metrics::counter!("ticketing_tickets_sold_total").increment(u64::from(quantity));
    metrics::counter!("ticketing_payment_revenue_minor_total").increment(amount_minor);
    tracing::debug!(quantity, amount_minor, "Recorded tickets_sold metric");
}

/// Record a failed best-effort side effect.
///
/// # Arguments
///
/// * `kind` - `sold_count` or `email`
pub fn record_side_effect_failure(kind: &'static str) {
    metrics::counter!("ticketing_side_effect_failures_total", "kind" => kind).increment(1);
    tracing::debug!(kind, "Recorded side_effect_failure metric");
}

/// Record a webhook refused before processing.
///
/// # Arguments
///
/// * `reason` - `signature` or `payload`
pub fn record_webhook_rejected(reason: &'static str) {
    metrics::counter!("ticketing_webhooks_rejected_total", "reason" => reason).increment(1);
    tracing::debug!(reason, "Recorded webhook_rejected metric");
}

/// Record a delivered confirmation email.
pub fn record_confirmation_sent() {
    metrics::counter!("ticketing_confirmations_sent_total").increment(1);
}

/// Record the duration of a gateway call.
///
/// # Arguments
///
/// * `operation` - `initialize` or `verify`
pub fn record_gateway_call(operation: &'static str, elapsed: Duration) {
    metrics::histogram!("ticketing_gateway_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}
