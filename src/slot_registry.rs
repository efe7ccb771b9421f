//! Ownership of slot availability.
//!
//! The registry is the only component that moves a slot between
//! `Available` and `Taken`. Claims go through [`SlotRegistry::claim`], which
//! delegates to the store's conditional write, so two claims on the same
//! slot can never both succeed while claims on different slots never wait
//! on each other.

use crate::{
    backend::{ClaimOutcome, Store},
    error::{BookingError, Result},
    types::{NewSlot, Slot, SlotChanges},
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch::{self, Sender};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};
use validator::Validate;

#[derive(Clone)]
pub struct SlotRegistry<S: Store> {
    store: S,
    sender: Arc<Sender<Vec<Slot>>>,
    /// Held from snapshot read to send, so an older snapshot never replaces a newer one.
    publishing: Arc<Mutex<()>>,
}

impl<S: Store> SlotRegistry<S> {
    pub fn new(store: S) -> Self {
        let (sender, _) = watch::channel(vec![]);
        Self {
            store,
            sender: Arc::new(sender),
            publishing: Arc::default(),
        }
    }

    pub fn list(&self) -> Result<Vec<Slot>> {
        self.store.slots()
    }

    pub fn create(&self, new_slot: NewSlot) -> Result<Slot> {
        new_slot.validate()?;
        if self.store.stylist(new_slot.stylist_id)?.is_none() {
            return Err(BookingError::not_found("stylist", new_slot.stylist_id));
        }

        let slot = self.store.insert_slot(new_slot)?;
        info!(slot_id = slot.id, stylist_id = slot.stylist_id, "Slot created");
        self.publish();
        Ok(slot)
    }

    /// Atomically moves the slot from available to taken.
    ///
    /// `AlreadyTaken` is an ordinary outcome, not a fault.
    pub fn claim(&self, slot_id: i32) -> Result<ClaimOutcome> {
        let outcome = self.store.claim_slot(slot_id)?;
        match &outcome {
            ClaimOutcome::Claimed(_) => {
                debug!(slot_id, "Slot claimed");
                self.publish();
            }
            ClaimOutcome::AlreadyTaken => debug!(slot_id, "Slot already taken"),
            ClaimOutcome::NotFound => debug!(slot_id, "Claim on unknown slot"),
        }
        Ok(outcome)
    }

    pub fn release(&self, slot_id: i32) -> Result<Slot> {
        let slot = self
            .store
            .release_slot(slot_id)?
            .ok_or_else(|| BookingError::not_found("slot", slot_id))?;
        debug!(slot_id, "Slot released");
        self.publish();
        Ok(slot)
    }

    /// Releases the slot only if it is taken and no reservation references it.
    pub fn release_unreserved(&self, slot_id: i32) -> Result<Option<Slot>> {
        let released = self.store.release_unreserved_slot(slot_id)?;
        if released.is_some() {
            debug!(slot_id, "Unreserved slot released");
            self.publish();
        }
        Ok(released)
    }

    pub fn update(&self, slot_id: i32, changes: SlotChanges) -> Result<Slot> {
        changes.validate()?;
        if changes.is_empty() {
            return Err(BookingError::Validation(
                "no slot field to update".to_string(),
            ));
        }
        if let Some(stylist_id) = changes.stylist_id {
            if self.store.stylist(stylist_id)?.is_none() {
                return Err(BookingError::not_found("stylist", stylist_id));
            }
        }

        let slot = self.store.update_slot(slot_id, changes)?;
        info!(slot_id, "Slot updated");
        self.publish();
        Ok(slot)
    }

    pub fn delete(&self, slot_id: i32) -> Result<()> {
        self.store.delete_slot(slot_id)?;
        info!(slot_id, "Slot deleted");
        self.publish();
        Ok(())
    }

    /// Stream of slot snapshots, starting with the current one and updated
    /// after every registry mutation.
    pub fn subscribe(&self) -> WatchStream<Vec<Slot>> {
        let stream = WatchStream::new(self.sender.subscribe());
        self.publish();
        stream
    }

    fn publish(&self) {
        if self.sender.receiver_count() == 0 {
            return;
        }
        let _publishing = self.publishing.lock();
        match self.store.slots() {
            Ok(slots) => {
                self.sender.send_replace(slots);
            }
            Err(err) => warn!(%err, "Failed to publish slot snapshot"),
        }
    }
}
