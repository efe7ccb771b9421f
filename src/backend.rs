use crate::error::Result;
use crate::types::{
    Client, NewClient, NewReservation, NewSalon, NewSlot, NewStylist, Reservation, Salon, Slot,
    SlotChanges, Stylist,
};

/// Outcome of an atomic available -> taken transition.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    Claimed(Slot),
    AlreadyTaken,
    NotFound,
}

/// Slot state. Every method is a single indivisible step with respect to
/// other calls on the same slot id.
pub trait SlotStore: Clone + Send + Sync + 'static {
    fn slots(&self) -> Result<Vec<Slot>>;
    fn slot(&self, id: i32) -> Result<Option<Slot>>;
    fn insert_slot(&self, new_slot: NewSlot) -> Result<Slot>;
    /// Sets `available = false` only if it is currently `true`.
    fn claim_slot(&self, id: i32) -> Result<ClaimOutcome>;
    /// Sets `available = true`. `None` if the slot does not exist.
    fn release_slot(&self, id: i32) -> Result<Option<Slot>>;
    /// Sets `available = true` only if the slot is taken and no reservation
    /// references it, checked and written as one step. `None` when the
    /// precondition does not hold or the slot does not exist.
    fn release_unreserved_slot(&self, id: i32) -> Result<Option<Slot>>;
    /// Fails with `Conflict` if the slot is taken.
    fn update_slot(&self, id: i32, changes: SlotChanges) -> Result<Slot>;
    /// Fails with `Conflict` if the slot is taken.
    fn delete_slot(&self, id: i32) -> Result<()>;
}

pub trait ReservationStore: Clone + Send + Sync + 'static {
    fn reservations(&self) -> Result<Vec<Reservation>>;
    fn reservation(&self, id: i32) -> Result<Option<Reservation>>;
    fn reservation_by_slot(&self, slot_id: i32) -> Result<Option<Reservation>>;
    /// Fails if another reservation already references the slot.
    fn insert_reservation(&self, new_reservation: NewReservation) -> Result<Reservation>;
    fn delete_reservation(&self, id: i32) -> Result<Option<Reservation>>;
}

/// Clients, salons and stylists. Deleting a record that is still referenced
/// fails with `Conflict`.
pub trait EntityStore: Clone + Send + Sync + 'static {
    fn clients(&self) -> Result<Vec<Client>>;
    fn insert_client(&self, new_client: NewClient) -> Result<Client>;
    fn update_client(&self, client: Client) -> Result<Option<Client>>;
    fn delete_client(&self, id: i32) -> Result<bool>;

    fn salons(&self) -> Result<Vec<Salon>>;
    fn salon(&self, id: i32) -> Result<Option<Salon>>;
    fn insert_salon(&self, new_salon: NewSalon) -> Result<Salon>;
    fn update_salon(&self, salon: Salon) -> Result<Option<Salon>>;
    fn delete_salon(&self, id: i32) -> Result<bool>;

    fn stylists(&self) -> Result<Vec<Stylist>>;
    fn stylist(&self, id: i32) -> Result<Option<Stylist>>;
    fn insert_stylist(&self, new_stylist: NewStylist) -> Result<Stylist>;
    fn update_stylist(&self, stylist: Stylist) -> Result<Option<Stylist>>;
    fn delete_stylist(&self, id: i32) -> Result<bool>;
}

pub trait Store: SlotStore + ReservationStore + EntityStore {}

impl<T: SlotStore + ReservationStore + EntityStore> Store for T {}
