//! Reservation Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::iso_millis;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Seated,
    Cancelled,
}

/// Reservation as reported by an external booking source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    /// Name of the table/bar the booking is attached to
    pub placeable_name: String,
    pub guest_name: String,
    #[serde(with = "iso_millis")]
    pub scheduled_for: DateTime<Utc>,
    pub status: ReservationStatus,
}
