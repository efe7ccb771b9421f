use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::StreamExt;
use parking_lot::Mutex;
use tokio_stream::wrappers::WatchStream;

use crate::{
    backend::{ClaimOutcome, EntityStore, ReservationStore, SlotStore},
    error::{BookingError, Result},
    local_store::LocalStore,
    types::{
        Client, NewClient, NewReservation, NewSalon, NewSlot, NewStylist, Reservation, Salon,
        Slot, SlotChanges, Stylist,
    },
};

pub fn seed_salon_with_stylist<S: EntityStore>(store: &S) -> (Salon, Stylist) {
    let salon = store
        .insert_salon(NewSalon {
            name: "Salon Opera".into(),
        })
        .unwrap();
    let stylist = store
        .insert_stylist(NewStylist {
            salon_id: salon.id,
            firstname: "Lea".into(),
            lastname: "Moreau".into(),
        })
        .unwrap();
    (salon, stylist)
}

/// Panics unless every slot is taken iff exactly one reservation references it.
pub fn assert_slot_invariant<S: SlotStore + ReservationStore>(store: &S) {
    let mut references: HashMap<i32, usize> = HashMap::new();
    for reservation in store.reservations().unwrap() {
        *references.entry(reservation.slot_id).or_default() += 1;
    }
    for slot in store.slots().unwrap() {
        let count = references.get(&slot.id).copied().unwrap_or(0);
        assert!(count <= 1, "slot {} referenced {count} times", slot.id);
        assert_eq!(
            !slot.available,
            count == 1,
            "slot {} available={} with {count} reservations",
            slot.id,
            slot.available
        );
    }
}

pub async fn read_from_slot_stream(stream: &mut WatchStream<Vec<Slot>>) -> Vec<Slot> {
    tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("no slot snapshot published")
        .expect("slot stream closed")
}

pub type Hook = Box<dyn FnOnce() + Send>;

pub struct FaultyStoreInner {
    pub store: LocalStore,
    /// Runs once before the next reservation listing reads the store.
    pub before_reservations: Mutex<Option<Hook>>,
    /// Runs once after the next reservation listing has read the store.
    pub after_reservations: Mutex<Option<Hook>>,
    pub fail_insert_reservation: AtomicBool,
    pub fail_release_slot: AtomicBool,
    pub calls_to_claim_slot: AtomicU64,
    pub calls_to_release_slot: AtomicU64,
    pub calls_to_insert_reservation: AtomicU64,
}

/// Wraps a [`LocalStore`] and fails selected operations on demand.
#[derive(Clone)]
pub struct FaultyStore(pub Arc<FaultyStoreInner>);

impl FaultyStore {
    pub fn new() -> Self {
        Self(Arc::new(FaultyStoreInner {
            store: LocalStore::default(),
            before_reservations: Mutex::new(None),
            after_reservations: Mutex::new(None),
            fail_insert_reservation: AtomicBool::new(false),
            fail_release_slot: AtomicBool::new(false),
            calls_to_claim_slot: AtomicU64::default(),
            calls_to_release_slot: AtomicU64::default(),
            calls_to_insert_reservation: AtomicU64::default(),
        }))
    }

    fn injected(operation: &str) -> BookingError {
        BookingError::Storage(format!("{operation} supposed to fail"))
    }

    fn run_hook(hook: &Mutex<Option<Hook>>) {
        let hook = hook.lock().take();
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl SlotStore for FaultyStore {
    fn slots(&self) -> Result<Vec<Slot>> {
        self.0.store.slots()
    }

    fn slot(&self, id: i32) -> Result<Option<Slot>> {
        self.0.store.slot(id)
    }

    fn insert_slot(&self, new_slot: NewSlot) -> Result<Slot> {
        self.0.store.insert_slot(new_slot)
    }

    fn claim_slot(&self, id: i32) -> Result<ClaimOutcome> {
        self.0.calls_to_claim_slot.fetch_add(1, Ordering::SeqCst);
        self.0.store.claim_slot(id)
    }

    fn release_slot(&self, id: i32) -> Result<Option<Slot>> {
        self.0.calls_to_release_slot.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_release_slot.load(Ordering::SeqCst) {
            return Err(Self::injected("release"));
        }
        self.0.store.release_slot(id)
    }

    fn release_unreserved_slot(&self, id: i32) -> Result<Option<Slot>> {
        self.0.calls_to_release_slot.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_release_slot.load(Ordering::SeqCst) {
            return Err(Self::injected("release"));
        }
        self.0.store.release_unreserved_slot(id)
    }

    fn update_slot(&self, id: i32, changes: SlotChanges) -> Result<Slot> {
        self.0.store.update_slot(id, changes)
    }

    fn delete_slot(&self, id: i32) -> Result<()> {
        self.0.store.delete_slot(id)
    }
}

impl ReservationStore for FaultyStore {
    fn reservations(&self) -> Result<Vec<Reservation>> {
        Self::run_hook(&self.0.before_reservations);
        let reservations = self.0.store.reservations()?;
        Self::run_hook(&self.0.after_reservations);
        Ok(reservations)
    }

    fn reservation(&self, id: i32) -> Result<Option<Reservation>> {
        self.0.store.reservation(id)
    }

    fn reservation_by_slot(&self, slot_id: i32) -> Result<Option<Reservation>> {
        self.0.store.reservation_by_slot(slot_id)
    }

    fn insert_reservation(&self, new_reservation: NewReservation) -> Result<Reservation> {
        self.0
            .calls_to_insert_reservation
            .fetch_add(1, Ordering::SeqCst);
        if self.0.fail_insert_reservation.load(Ordering::SeqCst) {
            return Err(Self::injected("insert"));
        }
        self.0.store.insert_reservation(new_reservation)
    }

    fn delete_reservation(&self, id: i32) -> Result<Option<Reservation>> {
        self.0.store.delete_reservation(id)
    }
}

impl EntityStore for FaultyStore {
    fn clients(&self) -> Result<Vec<Client>> {
        self.0.store.clients()
    }

    fn insert_client(&self, new_client: NewClient) -> Result<Client> {
        self.0.store.insert_client(new_client)
    }

    fn update_client(&self, client: Client) -> Result<Option<Client>> {
        self.0.store.update_client(client)
    }

    fn delete_client(&self, id: i32) -> Result<bool> {
        self.0.store.delete_client(id)
    }

    fn salons(&self) -> Result<Vec<Salon>> {
        self.0.store.salons()
    }

    fn salon(&self, id: i32) -> Result<Option<Salon>> {
        self.0.store.salon(id)
    }

    fn insert_salon(&self, new_salon: NewSalon) -> Result<Salon> {
        self.0.store.insert_salon(new_salon)
    }

    fn update_salon(&self, salon: Salon) -> Result<Option<Salon>> {
        self.0.store.update_salon(salon)
    }

    fn delete_salon(&self, id: i32) -> Result<bool> {
        self.0.store.delete_salon(id)
    }

    fn stylists(&self) -> Result<Vec<Stylist>> {
        self.0.store.stylists()
    }

    fn stylist(&self, id: i32) -> Result<Option<Stylist>> {
        self.0.store.stylist(id)
    }

    fn insert_stylist(&self, new_stylist: NewStylist) -> Result<Stylist> {
        self.0.store.insert_stylist(new_stylist)
    }

    fn update_stylist(&self, stylist: Stylist) -> Result<Option<Stylist>> {
        self.0.store.update_stylist(stylist)
    }

    fn delete_stylist(&self, id: i32) -> Result<bool> {
        self.0.store.delete_stylist(id)
    }
}
