use crate::{
    backend::{ClaimOutcome, EntityStore, ReservationStore, SlotStore},
    error::{BookingError, Result},
    types::{
        Client, NewClient, NewReservation, NewSalon, NewSlot, NewStylist, Reservation, Salon,
        Slot, SlotChanges, Stylist,
    },
};
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct SlotCell {
    slot: Slot,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Sequence(AtomicI32);

impl Sequence {
    fn next(&self) -> i32 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Lock order: entity tables, slot map, slot cell, reservations.
#[derive(Debug, Default)]
struct Tables {
    slots: RwLock<HashMap<i32, Arc<Mutex<SlotCell>>>>,
    reservations: Mutex<BTreeMap<i32, Reservation>>,
    clients: RwLock<BTreeMap<i32, Client>>,
    salons: RwLock<BTreeMap<i32, Salon>>,
    stylists: RwLock<BTreeMap<i32, Stylist>>,
    slot_ids: Sequence,
    reservation_ids: Sequence,
    client_ids: Sequence,
    salon_ids: Sequence,
    stylist_ids: Sequence,
}

/// In-memory store used when no database is configured.
///
/// Each slot sits behind its own mutex so claims on different slots never
/// wait on each other. The slot map lock is only held for lookups and
/// structural changes. Every lock wait is bounded by `lock_timeout`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    tables: Arc<Tables>,
    lock_timeout: Duration,
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

fn timed_out(what: &str) -> BookingError {
    BookingError::Storage(format!("timed out waiting for {what}"))
}

impl LocalStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            tables: Arc::default(),
            lock_timeout,
        }
    }

    fn read<'a, T>(&self, table: &'a RwLock<T>, name: &str) -> Result<RwLockReadGuard<'a, T>> {
        table
            .try_read_for(self.lock_timeout)
            .ok_or_else(|| timed_out(name))
    }

    fn write<'a, T>(&self, table: &'a RwLock<T>, name: &str) -> Result<RwLockWriteGuard<'a, T>> {
        table
            .try_write_for(self.lock_timeout)
            .ok_or_else(|| timed_out(name))
    }

    fn reservations_table(&self) -> Result<MutexGuard<'_, BTreeMap<i32, Reservation>>> {
        self.tables
            .reservations
            .try_lock_for(self.lock_timeout)
            .ok_or_else(|| timed_out("reservation table"))
    }

    fn slot_cell(&self, id: i32) -> Result<Option<Arc<Mutex<SlotCell>>>> {
        let slots = self.read(&self.tables.slots, "slot table")?;
        Ok(slots.get(&id).cloned())
    }

    fn lock_cell<'a>(&self, cell: &'a Mutex<SlotCell>, id: i32) -> Result<MutexGuard<'a, SlotCell>> {
        cell.try_lock_for(self.lock_timeout)
            .ok_or_else(|| timed_out(&format!("slot {id}")))
    }

    /// Runs `f` while holding the lock of a live slot. `None` if the slot does not exist.
    fn with_slot<T>(&self, id: i32, f: impl FnOnce(&mut SlotCell) -> Result<T>) -> Result<Option<T>> {
        let Some(cell) = self.slot_cell(id)? else {
            return Ok(None);
        };
        let mut guard = self.lock_cell(&cell, id)?;
        if guard.deleted {
            return Ok(None);
        }
        f(&mut guard).map(Some)
    }

    fn live_slots(&self) -> Result<Vec<Slot>> {
        let cells: Vec<_> = self
            .read(&self.tables.slots, "slot table")?
            .values()
            .cloned()
            .collect();

        let mut slots = Vec::with_capacity(cells.len());
        for cell in cells {
            let guard = cell
                .try_lock_for(self.lock_timeout)
                .ok_or_else(|| timed_out("slot snapshot"))?;
            if !guard.deleted {
                slots.push(guard.slot.clone());
            }
        }
        slots.sort_unstable_by(|a, b| a.datetime.cmp(&b.datetime).then(a.id.cmp(&b.id)));
        Ok(slots)
    }

    fn slot_reserved(&self, slot_id: i32) -> Result<bool> {
        Ok(self
            .reservations_table()?
            .values()
            .any(|reservation| reservation.slot_id == slot_id))
    }

    fn stylist_exists(stylists: &BTreeMap<i32, Stylist>, id: i32) -> Result<()> {
        if stylists.contains_key(&id) {
            Ok(())
        } else {
            Err(BookingError::Conflict(format!("stylist {id} does not exist")))
        }
    }

    fn salon_exists(salons: &BTreeMap<i32, Salon>, id: i32) -> Result<()> {
        if salons.contains_key(&id) {
            Ok(())
        } else {
            Err(BookingError::Conflict(format!("salon {id} does not exist")))
        }
    }
}

impl SlotStore for LocalStore {
    fn slots(&self) -> Result<Vec<Slot>> {
        self.live_slots()
    }

    fn slot(&self, id: i32) -> Result<Option<Slot>> {
        self.with_slot(id, |cell| Ok(cell.slot.clone()))
    }

    fn insert_slot(&self, new_slot: NewSlot) -> Result<Slot> {
        let stylists = self.read(&self.tables.stylists, "stylist table")?;
        Self::stylist_exists(&stylists, new_slot.stylist_id)?;

        let slot = Slot {
            id: self.tables.slot_ids.next(),
            stylist_id: new_slot.stylist_id,
            datetime: new_slot.datetime,
            available: true,
        };
        let cell = SlotCell {
            slot: slot.clone(),
            deleted: false,
        };
        self.write(&self.tables.slots, "slot table")?
            .insert(slot.id, Arc::new(Mutex::new(cell)));
        Ok(slot)
    }

    fn claim_slot(&self, id: i32) -> Result<ClaimOutcome> {
        let outcome = self.with_slot(id, |cell| {
            if !cell.slot.available {
                return Ok(ClaimOutcome::AlreadyTaken);
            }
            cell.slot.available = false;
            Ok(ClaimOutcome::Claimed(cell.slot.clone()))
        })?;
        Ok(outcome.unwrap_or(ClaimOutcome::NotFound))
    }

    fn release_slot(&self, id: i32) -> Result<Option<Slot>> {
        self.with_slot(id, |cell| {
            cell.slot.available = true;
            Ok(cell.slot.clone())
        })
    }

    fn release_unreserved_slot(&self, id: i32) -> Result<Option<Slot>> {
        // Reservation inserts hold the same cell lock, so none can land in between.
        let released = self.with_slot(id, |cell| {
            if cell.slot.available || self.slot_reserved(id)? {
                return Ok(None);
            }
            cell.slot.available = true;
            Ok(Some(cell.slot.clone()))
        })?;
        Ok(released.flatten())
    }

    fn update_slot(&self, id: i32, changes: SlotChanges) -> Result<Slot> {
        let stylists = self.read(&self.tables.stylists, "stylist table")?;
        if let Some(stylist_id) = changes.stylist_id {
            Self::stylist_exists(&stylists, stylist_id)?;
        }

        self.with_slot(id, |cell| {
            if !cell.slot.available {
                return Err(BookingError::Conflict(format!(
                    "slot {id} is reserved and can't be modified"
                )));
            }
            if let Some(stylist_id) = changes.stylist_id {
                cell.slot.stylist_id = stylist_id;
            }
            if let Some(datetime) = changes.datetime {
                cell.slot.datetime = datetime;
            }
            Ok(cell.slot.clone())
        })?
        .ok_or_else(|| BookingError::not_found("slot", id))
    }

    fn delete_slot(&self, id: i32) -> Result<()> {
        let tombstoned = self.with_slot(id, |cell| {
            if !cell.slot.available || self.slot_reserved(id)? {
                return Err(BookingError::Conflict(format!(
                    "slot {id} is reserved and can't be deleted"
                )));
            }
            cell.deleted = true;
            Ok(())
        })?;
        if tombstoned.is_none() {
            return Err(BookingError::not_found("slot", id));
        }

        self.write(&self.tables.slots, "slot table")?.remove(&id);
        Ok(())
    }
}

impl ReservationStore for LocalStore {
    fn reservations(&self) -> Result<Vec<Reservation>> {
        Ok(self.reservations_table()?.values().cloned().collect())
    }

    fn reservation(&self, id: i32) -> Result<Option<Reservation>> {
        Ok(self.reservations_table()?.get(&id).cloned())
    }

    fn reservation_by_slot(&self, slot_id: i32) -> Result<Option<Reservation>> {
        Ok(self
            .reservations_table()?
            .values()
            .find(|reservation| reservation.slot_id == slot_id)
            .cloned())
    }

    fn insert_reservation(&self, new_reservation: NewReservation) -> Result<Reservation> {
        let salons = self.read(&self.tables.salons, "salon table")?;
        let stylists = self.read(&self.tables.stylists, "stylist table")?;
        Self::salon_exists(&salons, new_reservation.salon_id)?;
        Self::stylist_exists(&stylists, new_reservation.stylist_id)?;

        let slot_id = new_reservation.slot_id;
        self.with_slot(slot_id, |_| {
            let mut reservations = self.reservations_table()?;
            if reservations.values().any(|existing| existing.slot_id == slot_id) {
                return Err(BookingError::Conflict(format!(
                    "slot {slot_id} already has a reservation"
                )));
            }
            let reservation = Reservation {
                id: self.tables.reservation_ids.next(),
                salon_id: new_reservation.salon_id,
                stylist_id: new_reservation.stylist_id,
                slot_id,
            };
            reservations.insert(reservation.id, reservation.clone());
            Ok(reservation)
        })?
        .ok_or_else(|| BookingError::Conflict(format!("slot {slot_id} does not exist")))
    }

    fn delete_reservation(&self, id: i32) -> Result<Option<Reservation>> {
        Ok(self.reservations_table()?.remove(&id))
    }
}

impl EntityStore for LocalStore {
    fn clients(&self) -> Result<Vec<Client>> {
        Ok(self
            .read(&self.tables.clients, "client table")?
            .values()
            .cloned()
            .collect())
    }

    fn insert_client(&self, new_client: NewClient) -> Result<Client> {
        let mut clients = self.write(&self.tables.clients, "client table")?;
        let client = Client {
            id: self.tables.client_ids.next(),
            firstname: new_client.firstname,
            lastname: new_client.lastname,
            email: new_client.email,
        };
        clients.insert(client.id, client.clone());
        Ok(client)
    }

    fn update_client(&self, client: Client) -> Result<Option<Client>> {
        let mut clients = self.write(&self.tables.clients, "client table")?;
        Ok(clients.get_mut(&client.id).map(|existing| {
            *existing = client;
            existing.clone()
        }))
    }

    fn delete_client(&self, id: i32) -> Result<bool> {
        Ok(self
            .write(&self.tables.clients, "client table")?
            .remove(&id)
            .is_some())
    }

    fn salons(&self) -> Result<Vec<Salon>> {
        Ok(self
            .read(&self.tables.salons, "salon table")?
            .values()
            .cloned()
            .collect())
    }

    fn salon(&self, id: i32) -> Result<Option<Salon>> {
        Ok(self.read(&self.tables.salons, "salon table")?.get(&id).cloned())
    }

    fn insert_salon(&self, new_salon: NewSalon) -> Result<Salon> {
        let mut salons = self.write(&self.tables.salons, "salon table")?;
        let salon = Salon {
            id: self.tables.salon_ids.next(),
            name: new_salon.name,
        };
        salons.insert(salon.id, salon.clone());
        Ok(salon)
    }

    fn update_salon(&self, salon: Salon) -> Result<Option<Salon>> {
        let mut salons = self.write(&self.tables.salons, "salon table")?;
        Ok(salons.get_mut(&salon.id).map(|existing| {
            *existing = salon;
            existing.clone()
        }))
    }

    fn delete_salon(&self, id: i32) -> Result<bool> {
        let mut salons = self.write(&self.tables.salons, "salon table")?;
        if !salons.contains_key(&id) {
            return Ok(false);
        }
        let has_stylists = self
            .read(&self.tables.stylists, "stylist table")?
            .values()
            .any(|stylist| stylist.salon_id == id);
        let has_reservations = self
            .reservations_table()?
            .values()
            .any(|reservation| reservation.salon_id == id);
        if has_stylists || has_reservations {
            return Err(BookingError::Conflict(format!("salon {id} is still referenced")));
        }
        salons.remove(&id);
        Ok(true)
    }

    fn stylists(&self) -> Result<Vec<Stylist>> {
        Ok(self
            .read(&self.tables.stylists, "stylist table")?
            .values()
            .cloned()
            .collect())
    }

    fn stylist(&self, id: i32) -> Result<Option<Stylist>> {
        Ok(self
            .read(&self.tables.stylists, "stylist table")?
            .get(&id)
            .cloned())
    }

    fn insert_stylist(&self, new_stylist: NewStylist) -> Result<Stylist> {
        let salons = self.read(&self.tables.salons, "salon table")?;
        Self::salon_exists(&salons, new_stylist.salon_id)?;
        let stylist = Stylist {
            id: self.tables.stylist_ids.next(),
            salon_id: new_stylist.salon_id,
            firstname: new_stylist.firstname,
            lastname: new_stylist.lastname,
        };
        self.write(&self.tables.stylists, "stylist table")?
            .insert(stylist.id, stylist.clone());
        Ok(stylist)
    }

    fn update_stylist(&self, stylist: Stylist) -> Result<Option<Stylist>> {
        let salons = self.read(&self.tables.salons, "salon table")?;
        Self::salon_exists(&salons, stylist.salon_id)?;
        let mut stylists = self.write(&self.tables.stylists, "stylist table")?;
        Ok(stylists.get_mut(&stylist.id).map(|existing| {
            *existing = stylist;
            existing.clone()
        }))
    }

    fn delete_stylist(&self, id: i32) -> Result<bool> {
        let mut stylists = self.write(&self.tables.stylists, "stylist table")?;
        if !stylists.contains_key(&id) {
            return Ok(false);
        }
        let has_slots = self
            .live_slots()?
            .iter()
            .any(|slot| slot.stylist_id == id);
        let has_reservations = self
            .reservations_table()?
            .values()
            .any(|reservation| reservation.stylist_id == id);
        if has_slots || has_reservations {
            return Err(BookingError::Conflict(format!("stylist {id} is still referenced")));
        }
        stylists.remove(&id);
        Ok(true)
    }
}
