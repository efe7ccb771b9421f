//! Booking and cancellation of reservations.
//!
//! A booking is a two step saga against two resources: claim the slot in the
//! [`SlotRegistry`], then insert the reservation. If the insert fails the
//! claim is undone by releasing the slot. A cancellation deletes the
//! reservation and then releases its slot.
//!
//! When an undo or a release itself fails, the slot is left taken without a
//! reservation. It is recorded as a pending repair, reported to the caller as
//! [`BookingError::Inconsistency`], and fixed by [`ReservationEngine::reconcile`].

use crate::{
    backend::{ClaimOutcome, Store},
    error::{BookingError, Result},
    slot_registry::SlotRegistry,
    types::{NewReservation, Reservation, Slot},
};
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
    time::Duration,
};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use validator::Validate;

/// Slots repaired by one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Taken slots without a reservation, made available again.
    pub released: Vec<i32>,
    /// Available slots that had a reservation, marked taken again.
    pub reclaimed: Vec<i32>,
    /// Slots still waiting for a repair after this pass.
    pub pending: Vec<i32>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.released.is_empty() && self.reclaimed.is_empty() && self.pending.is_empty()
    }
}

#[derive(Clone)]
pub struct ReservationEngine<S: Store> {
    store: S,
    registry: SlotRegistry<S>,
    /// Slots between claim and reservation insert, with the number of bookings racing on each.
    in_flight: Arc<Mutex<HashMap<i32, usize>>>,
    pending_repairs: Arc<Mutex<BTreeSet<i32>>>,
}

/// Marks a slot as being booked until dropped.
struct InFlight<'a> {
    slots: &'a Mutex<HashMap<i32, usize>>,
    slot_id: i32,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        if let Some(count) = slots.get_mut(&self.slot_id) {
            *count -= 1;
            if *count == 0 {
                slots.remove(&self.slot_id);
            }
        }
    }
}

impl<S: Store> ReservationEngine<S> {
    pub fn new(store: S, registry: SlotRegistry<S>) -> Self {
        Self {
            store,
            registry,
            in_flight: Arc::default(),
            pending_repairs: Arc::default(),
        }
    }

    pub fn reservations(&self) -> Result<Vec<Reservation>> {
        self.store.reservations()
    }

    pub fn pending_repairs(&self) -> Vec<i32> {
        self.pending_repairs.lock().iter().copied().collect()
    }

    /// Claims the requested slot and records a reservation for it.
    ///
    /// Ends either with the slot taken and the reservation stored, or with
    /// the slot as it was before the call. The only exception is a failing
    /// undo, reported as `Inconsistency`.
    pub fn book(&self, request: NewReservation) -> Result<Reservation> {
        request.validate()?;

        let salon = self
            .store
            .salon(request.salon_id)?
            .ok_or_else(|| BookingError::not_found("salon", request.salon_id))?;
        let stylist = self
            .store
            .stylist(request.stylist_id)?
            .ok_or_else(|| BookingError::not_found("stylist", request.stylist_id))?;
        if stylist.salon_id != salon.id {
            return Err(BookingError::Validation(format!(
                "stylist {} does not work at salon {}",
                stylist.id, salon.id
            )));
        }

        let _in_flight = self.track_in_flight(request.slot_id);
        let slot = match self.registry.claim(request.slot_id)? {
            ClaimOutcome::Claimed(slot) => slot,
            ClaimOutcome::AlreadyTaken => {
                debug!(slot_id = request.slot_id, "Booking lost the race for slot");
                return Err(BookingError::SlotUnavailable(request.slot_id));
            }
            ClaimOutcome::NotFound => {
                return Err(BookingError::not_found("slot", request.slot_id));
            }
        };

        if slot.stylist_id != request.stylist_id {
            let cause = BookingError::Validation(format!(
                "slot {} belongs to stylist {}, not {}",
                slot.id, slot.stylist_id, request.stylist_id
            ));
            return Err(self.undo_claim(slot.id, cause));
        }

        match self.store.insert_reservation(request) {
            Ok(reservation) => {
                info!(
                    reservation_id = reservation.id,
                    slot_id = reservation.slot_id,
                    salon_id = reservation.salon_id,
                    stylist_id = reservation.stylist_id,
                    "Reservation booked"
                );
                Ok(reservation)
            }
            Err(err) => {
                warn!(%err, slot_id = slot.id, "Reservation insert failed after claim, releasing slot");
                Err(self.undo_claim(slot.id, err))
            }
        }
    }

    /// Deletes the reservation and makes its slot available again.
    pub fn cancel(&self, reservation_id: i32) -> Result<Reservation> {
        if reservation_id < 1 {
            return Err(BookingError::Validation(format!(
                "invalid reservation id {reservation_id}"
            )));
        }

        let reservation = self
            .store
            .delete_reservation(reservation_id)?
            .ok_or_else(|| BookingError::not_found("reservation", reservation_id))?;

        if let Err(err) = self.registry.release(reservation.slot_id) {
            error!(
                %err,
                reservation_id,
                slot_id = reservation.slot_id,
                "Reservation deleted but slot release failed, slot queued for repair"
            );
            self.pending_repairs.lock().insert(reservation.slot_id);
            return Err(BookingError::Inconsistency {
                slot_id: reservation.slot_id,
                detail: format!("reservation {reservation_id} deleted but release failed: {err}"),
            });
        }

        info!(reservation_id, slot_id = reservation.slot_id, "Reservation cancelled");
        Ok(reservation)
    }

    /// Repair pass realigning slot availability with reservation existence.
    ///
    /// Slots are read before reservations, so a cancellation or booking
    /// completing during the pass can only make it skip a slot, never break one.
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        let slots = self.registry.list()?;
        let reserved: HashSet<i32> = self
            .store
            .reservations()?
            .into_iter()
            .map(|reservation| reservation.slot_id)
            .collect();

        let mut report = ReconcileReport::default();
        let mut live = HashSet::with_capacity(slots.len());
        for slot in slots {
            live.insert(slot.id);
            if self.is_in_flight(slot.id) {
                continue;
            }

            let has_reservation = reserved.contains(&slot.id);
            if !slot.available && !has_reservation {
                if self.release_stranded(slot.id)?.is_some() {
                    warn!(slot_id = slot.id, "Released slot taken without reservation");
                    report.released.push(slot.id);
                }
            } else if slot.available && has_reservation {
                if let ClaimOutcome::Claimed(_) = self.registry.claim(slot.id)? {
                    if self.registry.release_unreserved(slot.id)?.is_none() {
                        warn!(slot_id = slot.id, "Marked reserved slot as taken");
                        report.reclaimed.push(slot.id);
                    }
                }
            }
            self.pending_repairs.lock().remove(&slot.id);
        }

        let mut pending_repairs = self.pending_repairs.lock();
        pending_repairs.retain(|slot_id| live.contains(slot_id));
        report.pending = pending_repairs.iter().copied().collect();
        Ok(report)
    }

    /// Releases a slot that is taken without a reservation.
    ///
    /// Bookings register as in flight before claiming, so holding the
    /// in-flight map across the conditional release keeps a claim of this
    /// process from landing between the check and the write. The store
    /// re-checks reservation existence in the same step as the write.
    fn release_stranded(&self, slot_id: i32) -> Result<Option<Slot>> {
        let in_flight = self.in_flight.lock();
        if in_flight.contains_key(&slot_id) {
            return Ok(None);
        }
        self.registry.release_unreserved(slot_id)
    }

    fn track_in_flight(&self, slot_id: i32) -> InFlight<'_> {
        *self.in_flight.lock().entry(slot_id).or_default() += 1;
        InFlight {
            slots: &self.in_flight,
            slot_id,
        }
    }

    fn is_in_flight(&self, slot_id: i32) -> bool {
        self.in_flight.lock().contains_key(&slot_id)
    }

    /// Releases a slot claimed by a booking that can't complete and returns the
    /// error to report.
    fn undo_claim(&self, slot_id: i32, cause: BookingError) -> BookingError {
        match self.registry.release(slot_id) {
            Ok(_) => cause,
            Err(err) => {
                error!(%err, %cause, slot_id, "Undoing claim failed, slot queued for repair");
                self.pending_repairs.lock().insert(slot_id);
                BookingError::Inconsistency {
                    slot_id,
                    detail: format!("claimed without reservation ({cause}), release failed: {err}"),
                }
            }
        }
    }
}

/// Runs the repair pass every `period`, starting immediately.
pub async fn run_reconciliation<S: Store>(engine: ReservationEngine<S>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let engine = engine.clone();
        match tokio::task::spawn_blocking(move || engine.reconcile()).await {
            Ok(Ok(report)) if report.is_clean() => debug!("Reconciliation found nothing to repair"),
            Ok(Ok(report)) => warn!(?report, "Reconciliation repaired slots"),
            Ok(Err(err)) => error!(%err, "Reconciliation failed"),
            Err(err) => error!(%err, "Reconciliation task aborted"),
        }
    }
}
