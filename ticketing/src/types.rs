//! Domain types for ticket reservations and payment reconciliation.
//!
//! Everything that crosses an adapter boundary (store, gateway, notifier) is
//! defined here so the adapters and the reconciliation reducer agree on one
//! vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Identifiers
// ============================================================================

/// Gateway-issued identifier of a single purchase attempt.
///
/// Doubles as the reservation's primary key and as the idempotency key that
/// threads through issuing, verifying and webhook handling.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference(String);

impl Reference {
    /// Parses a reference, rejecting blank input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the reference as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the event record in the document store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Parses an event id, rejecting blank input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Money
// ============================================================================

/// Minor units per major unit (kobo per naira, cents per dollar).
pub const MINOR_UNITS_PER_MAJOR: u64 = 100;

/// Errors parsing a decimal price.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Nothing to parse
    #[error("amount is empty")]
    Empty,
    /// Not a plain non-negative decimal number
    #[error("amount '{0}' is not a valid decimal")]
    Invalid(String),
    /// More fractional digits than minor units can hold
    #[error("amount '{0}' has more than two decimal places")]
    TooPrecise(String),
    /// Does not fit in 64-bit minor units
    #[error("amount overflows")]
    Overflow,
}

/// Monetary amount in minor currency units.
///
/// Never constructed from a float: prices arrive as decimal text and are
/// converted with integer arithmetic only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from minor units
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Returns the amount in minor units
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.0
    }

    /// Parses a major-unit decimal such as `"2500"` or `"19.99"`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] for blank, negative, non-numeric, overly precise
    /// or overflowing input.
    pub fn from_major_str(text: &str) -> Result<Self, MoneyError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MoneyError::Empty);
        }

        let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty())
            || !all_digits(whole)
            || !all_digits(fraction)
        {
            return Err(MoneyError::Invalid(text.to_string()));
        }
        if fraction.len() > 2 {
            return Err(MoneyError::TooPrecise(text.to_string()));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| MoneyError::Overflow)?
        };
        let fraction_minor: u64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| MoneyError::Overflow)? * 10,
            _ => fraction.parse().map_err(|_| MoneyError::Overflow)?,
        };

        whole
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .and_then(|minor| minor.checked_add(fraction_minor))
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Multiplies by a ticket quantity, `None` on overflow
    #[must_use]
    pub const fn checked_mul(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(minor) => Some(Self(minor)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_UNITS_PER_MAJOR,
            self.0 % MINOR_UNITS_PER_MAJOR
        )
    }
}

// ============================================================================
// Reservation
// ============================================================================

/// Reservation status. `Paid` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Created before the buyer is redirected to pay
    Pending,
    /// Payment confirmed
    Paid,
}

impl ReservationStatus {
    /// Stored representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    /// Parses the stored representation
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buyer contact details
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
    /// Full name
    pub name: String,
    /// Email address (receives the confirmation)
    pub email: String,
    /// Phone number, if given
    pub phone: Option<String>,
}

/// Local record of one purchase attempt.
///
/// Persisted layout: `{reference, eventId, eventTitle, name, email, phone,
/// quantity, amount, status, createdAt}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Gateway reference (primary key)
    pub reference: Reference,
    /// Event being attended
    pub event_id: EventId,
    /// Event title, denormalized for display and email
    pub event_title: String,
    /// Buyer name
    pub name: String,
    /// Buyer email
    pub email: String,
    /// Buyer phone
    pub phone: Option<String>,
    /// Number of tickets (immutable)
    pub quantity: u32,
    /// Total charged in minor units (immutable)
    pub amount: Money,
    /// Current status
    pub status: ReservationStatus,
    /// When the reservation was issued
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Builds the `pending` record for an accepted charge.
    #[must_use]
    pub fn pending(
        reference: Reference,
        intent: &PurchaseIntent,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reference,
            event_id: intent.event_id.clone(),
            event_title: intent.event_title.clone(),
            name: intent.buyer.name.clone(),
            email: intent.buyer.email.clone(),
            phone: intent.buyer.phone.clone(),
            quantity: intent.quantity,
            amount,
            status: ReservationStatus::Pending,
            created_at,
        }
    }

    /// Whether payment has been confirmed
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.status == ReservationStatus::Paid
    }
}

/// Result of the conditional `pending → paid` write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaidTransition {
    /// This call moved the record from `pending` to `paid`
    Transitioned,
    /// The record was already `paid`; nothing changed
    AlreadyPaid,
}

impl PaidTransition {
    /// True only for the call that performed the transition
    #[must_use]
    pub const fn is_transition(&self) -> bool {
        matches!(self, Self::Transitioned)
    }
}

/// Event record holding the sold-ticket counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Event id
    pub id: EventId,
    /// Title, when the record was created by the catalog
    pub title: Option<String>,
    /// Start time, when known
    pub starts_at: Option<DateTime<Utc>>,
    /// Tickets sold so far
    pub sold_tickets: u64,
}

// ============================================================================
// Purchase intent and gateway payloads
// ============================================================================

/// Validated purchase request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseIntent {
    /// Event being attended
    pub event_id: EventId,
    /// Event title
    pub event_title: String,
    /// Buyer
    pub buyer: Buyer,
    /// Number of tickets, at least one
    pub quantity: u32,
    /// Price of one ticket
    pub unit_price: Money,
}

impl PurchaseIntent {
    /// `unit_price * quantity`, `None` on overflow
    #[must_use]
    pub const fn amount(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }

    /// Metadata echoed back by the gateway on verify and webhook
    #[must_use]
    pub fn metadata(&self) -> PurchaseMetadata {
        PurchaseMetadata {
            event_id: self.event_id.clone(),
            event_title: self.event_title.clone(),
            buyer_name: self.buyer.name.clone(),
            phone: self.buyer.phone.clone(),
            quantity: self.quantity,
        }
    }
}

/// Purchase intent as round-tripped through the gateway.
///
/// This is the only context the asynchronous webhook path receives about the
/// original purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseMetadata {
    /// Event id
    pub event_id: EventId,
    /// Event title
    pub event_title: String,
    /// Buyer name
    pub buyer_name: String,
    /// Buyer phone
    #[serde(default)]
    pub phone: Option<String>,
    /// Ticket quantity
    #[serde(deserialize_with = "quantity_from_number_or_string")]
    pub quantity: u32,
}

impl PurchaseMetadata {
    /// Lenient extraction from a gateway's free-form metadata field.
    ///
    /// Gateways return metadata as an object, an empty string, or not at all;
    /// anything that is not a complete object yields `None`.
    #[must_use]
    pub fn from_gateway_value(value: Option<serde_json::Value>) -> Option<Self> {
        value.and_then(|v| serde_json::from_value(v).ok())
    }
}

/// Gateways are inconsistent about numeric metadata; accept `3` and `"3"`.
fn quantity_from_number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => u32::try_from(n).map_err(de::Error::custom),
        Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

/// Request to open a charge at the gateway
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChargeRequest {
    /// Total in minor units
    pub amount: Money,
    /// ISO currency code
    pub currency: String,
    /// Buyer email
    pub email: String,
    /// Where the gateway sends the buyer after paying
    pub callback_url: String,
    /// Purchase intent to round-trip
    pub metadata: PurchaseMetadata,
}

/// Charge accepted by the gateway
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializedCharge {
    /// Gateway-issued reference
    pub reference: Reference,
    /// Payment page for the buyer
    pub redirect_url: String,
}

/// Gateway status string that means the charge succeeded.
pub const SUCCESS_STATUS: &str = "success";

/// Charge outcome as reported by the gateway
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedCharge {
    /// Reference that was verified
    pub reference: Reference,
    /// Raw gateway status (`success`, `failed`, `abandoned`, ...)
    pub status: String,
    /// Amount the gateway reports as charged
    pub amount: Option<Money>,
    /// Echoed purchase intent, when the gateway returned it intact
    pub metadata: Option<PurchaseMetadata>,
}

impl VerifiedCharge {
    /// Whether the gateway reports the charge as successful
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == SUCCESS_STATUS
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_charge_amount_is_exact() {
        let unit_price = Money::from_major_str("2500").unwrap();
        for _ in 0..1_000 {
            assert_eq!(unit_price.checked_mul(3), Some(Money::from_minor(750_000)));
        }
    }

    #[test]
    fn test_fractional_prices() {
        assert_eq!(Money::from_major_str("19.99").unwrap().minor(), 1_999);
        assert_eq!(Money::from_major_str("0.1").unwrap().minor(), 10);
        assert_eq!(Money::from_major_str("2500.0").unwrap().minor(), 250_000);
        assert_eq!(Money::from_major_str(".5").unwrap().minor(), 50);
    }

    #[test]
    fn test_invalid_prices() {
        assert_eq!(Money::from_major_str(""), Err(MoneyError::Empty));
        assert!(matches!(Money::from_major_str("-5"), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::from_major_str("1e3"), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::from_major_str("."), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::from_major_str("1.005"), Err(MoneyError::TooPrecise(_))));
        assert_eq!(
            Money::from_major_str("184467440737095516160"),
            Err(MoneyError::Overflow)
        );
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_minor(750_000).to_string(), "7500.00");
        assert_eq!(Money::from_minor(1_905).to_string(), "19.05");
    }

    #[test]
    fn test_reference_rejects_blank() {
        assert!(Reference::parse("   ").is_none());
        assert_eq!(Reference::parse(" ref_1 ").unwrap().as_str(), "ref_1");
    }

    #[test]
    fn test_reservation_serializes_record_layout() {
        let reservation = Reservation {
            reference: Reference::parse("ref_1").unwrap(),
            event_id: EventId::parse("evt_1").unwrap(),
            event_title: "Friday Jazz".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            quantity: 2,
            amount: Money::from_minor(500_000),
            status: ReservationStatus::Pending,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        };

        let json = serde_json::to_value(&reservation).unwrap();
        assert_eq!(json["eventId"], "evt_1");
        assert_eq!(json["eventTitle"], "Friday Jazz");
        assert_eq!(json["amount"], 500_000);
        assert_eq!(json["status"], "pending");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_metadata_accepts_string_quantity() {
        let value = serde_json::json!({
            "eventId": "evt_1",
            "eventTitle": "Friday Jazz",
            "buyerName": "Ada",
            "quantity": "3"
        });

        let metadata = PurchaseMetadata::from_gateway_value(Some(value)).unwrap();
        assert_eq!(metadata.quantity, 3);
        assert_eq!(metadata.phone, None);
    }

    #[test]
    fn test_metadata_rejects_empty_string() {
        let metadata = PurchaseMetadata::from_gateway_value(Some(serde_json::json!("")));
        assert!(metadata.is_none());
    }

    proptest! {
        #[test]
        fn prop_decimal_price_times_quantity(
            units in 0u64..1_000_000,
            cents in 0u64..100,
            quantity in 1u32..100,
        ) {
            let price = Money::from_major_str(&format!("{units}.{cents:02}")).unwrap();
            let total = price.checked_mul(quantity).unwrap();
            prop_assert_eq!(total.minor(), (units * 100 + cents) * u64::from(quantity));
        }
    }
}
