//! Reservations (holds) and their state machine.

use chrono::{DateTime, Duration, Utc};
use common::ReservationId;
use serde::{Deserialize, Serialize};

use crate::item::Sku;

/// The state of a reservation in its lifecycle.
///
/// State transitions:
/// ```text
/// Reserved ──┬──► Confirmed
///            ├──► Cancelled
///            └──► Expired
/// ```
///
/// Every reservation starts `Reserved` and takes exactly one of the three
/// transitions; no edges leave a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Stock is held, awaiting confirm/cancel or expiry.
    #[default]
    Reserved,

    /// Purchase completed; the held stock is permanently consumed.
    Confirmed,

    /// Explicitly released by the user; stock was credited back.
    Cancelled,

    /// TTL elapsed before confirm/cancel; stock was credited back.
    Expired,
}

impl ReservationStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Reserved)
    }

    /// Returns true if the transition to `next` is a legal edge.
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        matches!(self, ReservationStatus::Reserved) && next.is_terminal()
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Reserved => "RESERVED",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESERVED" => Ok(ReservationStatus::Reserved),
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            "EXPIRED" => Ok(ReservationStatus::Expired),
            other => Err(format!("unknown reservation status: {other}")),
        }
    }
}

/// A short-lived hold on a quantity of one inventory item.
///
/// The hold debited `quantity` from the item's available stock when it was
/// created; that debit is reversed exactly once iff the hold ends
/// `Cancelled` or `Expired`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub sku: Sku,
    pub user_id: String,
    pub quantity: u32,
    pub status: ReservationStatus,
    pub expires_at: DateTime<Utc>,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Creates a fresh hold in `Reserved` state expiring `ttl` from now.
    pub fn new_hold(
        sku: Sku,
        user_id: impl Into<String>,
        quantity: u32,
        idempotency_key: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            reservation_id: ReservationId::new(),
            sku,
            user_id: user_id.into(),
            quantity,
            status: ReservationStatus::Reserved,
            expires_at: now + ttl,
            idempotency_key: idempotency_key.into(),
            created_at: now,
        }
    }

    /// Returns true if the hold's TTL has elapsed as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_is_the_only_non_terminal_state() {
        assert!(!ReservationStatus::Reserved.is_terminal());
        assert!(ReservationStatus::Confirmed.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(ReservationStatus::Expired.is_terminal());
    }

    #[test]
    fn only_reserved_can_transition() {
        use ReservationStatus::*;

        for next in [Confirmed, Cancelled, Expired] {
            assert!(Reserved.can_transition_to(next));
        }
        assert!(!Reserved.can_transition_to(Reserved));

        for terminal in [Confirmed, Cancelled, Expired] {
            for next in [Reserved, Confirmed, Cancelled, Expired] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        use ReservationStatus::*;

        for status in [Reserved, Confirmed, Cancelled, Expired] {
            let parsed: ReservationStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("PENDING".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn status_serializes_screaming() {
        let json = serde_json::to_string(&ReservationStatus::Reserved).unwrap();
        assert_eq!(json, "\"RESERVED\"");
    }

    #[test]
    fn new_hold_starts_reserved_with_future_expiry() {
        let hold = Reservation::new_hold(
            Sku::new("SKU-001"),
            "user-1",
            2,
            "key-1",
            Duration::minutes(5),
        );

        assert_eq!(hold.status, ReservationStatus::Reserved);
        assert_eq!(hold.quantity, 2);
        assert!(hold.expires_at > Utc::now());
        assert!(!hold.is_expired(Utc::now()));
    }

    #[test]
    fn zero_ttl_hold_is_immediately_expired() {
        let hold = Reservation::new_hold(
            Sku::new("SKU-001"),
            "user-1",
            1,
            "key-1",
            Duration::zero(),
        );
        assert!(hold.is_expired(Utc::now()));
    }
}
