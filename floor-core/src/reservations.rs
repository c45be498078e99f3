//! Reservation signals (预订)
//!
//! An external booking source can mark a table as `reserved` when a booking
//! for today is pending, and `occupied` once the guests are seated. Both are
//! plain status writes; neither opens an account.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use shared::models::{Reservation, ReservationStatus, Status};
use thiserror::Error;
use tracing::{debug, info};

use crate::layout::FloorPlan;

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("Reservation not found: {0}")]
    NotFound(String),

    #[error("Reservation source unavailable: {0}")]
    Unavailable(String),
}

pub type ReservationResult<T> = Result<T, ReservationError>;

#[async_trait]
pub trait ReservationSource: Send + Sync {
    /// Booking attached to a table/bar, looked up by its display name
    async fn find_reservation_for_placeable(&self, placeable_name: &str) -> ReservationResult<Option<Reservation>>;

    async fn mark_seated(&self, reservation_id: &str) -> ReservationResult<()>;
}

/// What a reservation signal did to the placeable
#[derive(Debug, Clone, PartialEq)]
pub enum ReservationSignal {
    /// Placeable does not exist
    NotFound,
    /// No booking, or one that does not apply right now
    Unchanged,
    Reserved(Reservation),
}

/// Set `reserved` when a pending booking for `today` exists and the
/// placeable is free. A busy placeable is left alone.
pub async fn apply_reservation_signal(
    plan: &mut FloorPlan,
    placeable_id: &str,
    source: &dyn ReservationSource,
    today: NaiveDate,
) -> ReservationResult<ReservationSignal> {
    let Some(placeable) = plan.placeable(placeable_id) else {
        debug!(placeable_id, "Reservation signal for missing placeable skipped");
        return Ok(ReservationSignal::NotFound);
    };
    let name = placeable.name.clone();

    let Some(reservation) = source.find_reservation_for_placeable(&name).await? else {
        return Ok(ReservationSignal::Unchanged);
    };
    if reservation.status != ReservationStatus::Pending || reservation.scheduled_for.date_naive() != today {
        return Ok(ReservationSignal::Unchanged);
    }

    // Re-read after the await; the table may have been taken meanwhile
    let applied = plan
        .update_placeable(placeable_id, |p| {
            if p.status != Status::Free {
                return false;
            }
            p.status = Status::Reserved;
            true
        })
        .unwrap_or(false);
    if !applied {
        return Ok(ReservationSignal::Unchanged);
    }

    info!(placeable_id, reservation_id = %reservation.id, guest = %reservation.guest_name, "Placeable reserved");
    Ok(ReservationSignal::Reserved(reservation))
}

/// Seat the booking attached to a placeable: the source is told first, the
/// status becomes `occupied` only once it confirms.
pub async fn seat_reservation(
    plan: &mut FloorPlan,
    placeable_id: &str,
    source: &dyn ReservationSource,
) -> ReservationResult<Option<Reservation>> {
    let Some(placeable) = plan.placeable(placeable_id) else {
        debug!(placeable_id, "Seat reservation for missing placeable skipped");
        return Ok(None);
    };
    let name = placeable.name.clone();

    let Some(mut reservation) = source.find_reservation_for_placeable(&name).await? else {
        return Ok(None);
    };
    source.mark_seated(&reservation.id).await?;
    reservation.status = ReservationStatus::Seated;

    plan.set_status(placeable_id, Status::Occupied);
    info!(placeable_id, reservation_id = %reservation.id, "Reservation seated");
    Ok(Some(reservation))
}

/// In-memory booking list
#[derive(Debug, Default)]
pub struct MemoryReservationSource {
    reservations: Mutex<Vec<Reservation>>,
}

impl MemoryReservationSource {
    pub fn new(reservations: Vec<Reservation>) -> Self {
        Self {
            reservations: Mutex::new(reservations),
        }
    }

    pub fn get(&self, reservation_id: &str) -> Option<Reservation> {
        self.reservations.lock().iter().find(|r| r.id == reservation_id).cloned()
    }
}

#[async_trait]
impl ReservationSource for MemoryReservationSource {
    async fn find_reservation_for_placeable(&self, placeable_name: &str) -> ReservationResult<Option<Reservation>> {
        Ok(self
            .reservations
            .lock()
            .iter()
            .find(|r| r.placeable_name == placeable_name && r.status != ReservationStatus::Cancelled)
            .cloned())
    }

    async fn mark_seated(&self, reservation_id: &str) -> ReservationResult<()> {
        let mut reservations = self.reservations.lock();
        let reservation = reservations
            .iter_mut()
            .find(|r| r.id == reservation_id)
            .ok_or_else(|| ReservationError::NotFound(reservation_id.to_string()))?;
        reservation.status = ReservationStatus::Seated;
        Ok(())
    }
}
