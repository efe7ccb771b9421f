use crate::{
    backend::{ClaimOutcome, EntityStore, ReservationStore, SlotStore},
    error::{BookingError, Result},
    schema::{clients, coiffeurs, creneaux, reservations, salons, BOOTSTRAP_SQL},
    types::{
        Client, NewClient, NewReservation, NewSalon, NewSlot, NewStylist, Reservation, Salon,
        Slot, SlotChanges, Stylist,
    },
};
use diesel::{
    connection::SimpleConnection,
    dsl::{exists, not},
    pg::PgConnection,
    prelude::*,
    r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection},
};
use std::time::Duration;
use tracing::info;

type PgPool = Pool<ConnectionManager<PgConnection>>;
type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Bounds every statement run on a pooled connection.
#[derive(Debug)]
struct StatementTimeout(Duration);

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for StatementTimeout {
    fn on_acquire(&self, connection: &mut PgConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        connection
            .batch_execute(&format!(
                "SET statement_timeout = {}",
                self.0.as_millis()
            ))
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// PostgreSQL store.
///
/// Claims are a single conditional `UPDATE`, so concurrent requests on the
/// same slot are serialized by the row lock PostgreSQL takes for it and
/// requests on different slots never wait on each other.
#[derive(Clone)]
pub struct DatabaseInterface {
    pool: PgPool,
}

impl DatabaseInterface {
    pub fn new(database_url: &str, pool_size: u32, timeout: Duration) -> Result<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(timeout)
            .connection_customizer(Box::new(StatementTimeout(timeout)))
            .build(manager)?;

        let database_interface = Self { pool };
        database_interface.bootstrap_tables()?;
        Ok(database_interface)
    }

    fn connection(&self) -> Result<PgPooledConnection> {
        Ok(self.pool.get()?)
    }

    fn bootstrap_tables(&self) -> Result<()> {
        self.connection()?.batch_execute(BOOTSTRAP_SQL)?;
        info!("Database tables ready");
        Ok(())
    }

    fn slot_exists(connection: &mut PgConnection, id: i32) -> Result<bool> {
        Ok(diesel::select(exists(
            creneaux::table.filter(creneaux::id_creneau.eq(id)),
        ))
        .get_result(connection)?)
    }

    /// Tells apart "no such slot" and "slot is taken" after a conditional
    /// write matched zero rows.
    fn taken_or_missing(connection: &mut PgConnection, id: i32, action: &str) -> BookingError {
        match Self::slot_exists(connection, id) {
            Ok(true) => BookingError::Conflict(format!("slot {id} is reserved and can't be {action}")),
            Ok(false) => BookingError::not_found("slot", id),
            Err(err) => err,
        }
    }

    #[cfg(test)]
    fn remove_all(&self) -> Result<()> {
        self.connection()?.batch_execute(
            "TRUNCATE reservations, creneaux, coiffeurs, salons, clients RESTART IDENTITY",
        )?;
        Ok(())
    }
}

impl SlotStore for DatabaseInterface {
    fn slots(&self) -> Result<Vec<Slot>> {
        let mut connection = self.connection()?;
        Ok(creneaux::table
            .select(Slot::as_select())
            .order((creneaux::datetime.asc(), creneaux::id_creneau.asc()))
            .load(&mut connection)?)
    }

    fn slot(&self, id: i32) -> Result<Option<Slot>> {
        let mut connection = self.connection()?;
        Ok(creneaux::table
            .find(id)
            .select(Slot::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn insert_slot(&self, new_slot: NewSlot) -> Result<Slot> {
        let mut connection = self.connection()?;
        Ok(diesel::insert_into(creneaux::table)
            .values(&new_slot)
            .returning(Slot::as_returning())
            .get_result(&mut connection)?)
    }

    fn claim_slot(&self, id: i32) -> Result<ClaimOutcome> {
        let mut connection = self.connection()?;
        let claimed = diesel::update(
            creneaux::table
                .filter(creneaux::id_creneau.eq(id))
                .filter(creneaux::available.eq(true)),
        )
        .set(creneaux::available.eq(false))
        .returning(Slot::as_returning())
        .get_result(&mut connection)
        .optional()?;

        match claimed {
            Some(slot) => Ok(ClaimOutcome::Claimed(slot)),
            // Zero rows: the slot is missing or its precondition no longer held.
            None => match Self::slot_exists(&mut connection, id)? {
                true => Ok(ClaimOutcome::AlreadyTaken),
                false => Ok(ClaimOutcome::NotFound),
            },
        }
    }

    fn release_slot(&self, id: i32) -> Result<Option<Slot>> {
        let mut connection = self.connection()?;
        Ok(diesel::update(creneaux::table.find(id))
            .set(creneaux::available.eq(true))
            .returning(Slot::as_returning())
            .get_result(&mut connection)
            .optional()?)
    }

    fn release_unreserved_slot(&self, id: i32) -> Result<Option<Slot>> {
        let mut connection = self.connection()?;
        let unreserved = not(exists(
            reservations::table.filter(reservations::id_creneau.eq(id)),
        ));
        Ok(diesel::update(
            creneaux::table
                .filter(creneaux::id_creneau.eq(id))
                .filter(creneaux::available.eq(false))
                .filter(unreserved),
        )
        .set(creneaux::available.eq(true))
        .returning(Slot::as_returning())
        .get_result(&mut connection)
        .optional()?)
    }

    fn update_slot(&self, id: i32, changes: SlotChanges) -> Result<Slot> {
        let mut connection = self.connection()?;
        let updated = diesel::update(
            creneaux::table
                .filter(creneaux::id_creneau.eq(id))
                .filter(creneaux::available.eq(true)),
        )
        .set(&changes)
        .returning(Slot::as_returning())
        .get_result(&mut connection)
        .optional()?;

        updated.ok_or_else(|| Self::taken_or_missing(&mut connection, id, "modified"))
    }

    fn delete_slot(&self, id: i32) -> Result<()> {
        let mut connection = self.connection()?;
        let deleted = diesel::delete(
            creneaux::table
                .filter(creneaux::id_creneau.eq(id))
                .filter(creneaux::available.eq(true)),
        )
        .execute(&mut connection)?;

        match deleted {
            0 => Err(Self::taken_or_missing(&mut connection, id, "deleted")),
            _ => Ok(()),
        }
    }
}

impl ReservationStore for DatabaseInterface {
    fn reservations(&self) -> Result<Vec<Reservation>> {
        let mut connection = self.connection()?;
        Ok(reservations::table
            .select(Reservation::as_select())
            .order(reservations::id_reservation.asc())
            .load(&mut connection)?)
    }

    fn reservation(&self, id: i32) -> Result<Option<Reservation>> {
        let mut connection = self.connection()?;
        Ok(reservations::table
            .find(id)
            .select(Reservation::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn reservation_by_slot(&self, slot_id: i32) -> Result<Option<Reservation>> {
        let mut connection = self.connection()?;
        Ok(reservations::table
            .filter(reservations::id_creneau.eq(slot_id))
            .select(Reservation::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn insert_reservation(&self, new_reservation: NewReservation) -> Result<Reservation> {
        let mut connection = self.connection()?;
        Ok(diesel::insert_into(reservations::table)
            .values(&new_reservation)
            .returning(Reservation::as_returning())
            .get_result(&mut connection)?)
    }

    fn delete_reservation(&self, id: i32) -> Result<Option<Reservation>> {
        let mut connection = self.connection()?;
        Ok(diesel::delete(reservations::table.find(id))
            .returning(Reservation::as_returning())
            .get_result(&mut connection)
            .optional()?)
    }
}

impl EntityStore for DatabaseInterface {
    fn clients(&self) -> Result<Vec<Client>> {
        let mut connection = self.connection()?;
        Ok(clients::table
            .select(Client::as_select())
            .order(clients::id_client.asc())
            .load(&mut connection)?)
    }

    fn insert_client(&self, new_client: NewClient) -> Result<Client> {
        let mut connection = self.connection()?;
        Ok(diesel::insert_into(clients::table)
            .values(&new_client)
            .returning(Client::as_returning())
            .get_result(&mut connection)?)
    }

    fn update_client(&self, client: Client) -> Result<Option<Client>> {
        let mut connection = self.connection()?;
        let id = client.id;
        Ok(diesel::update(clients::table.find(id))
            .set(&NewClient::from(client))
            .returning(Client::as_returning())
            .get_result(&mut connection)
            .optional()?)
    }

    fn delete_client(&self, id: i32) -> Result<bool> {
        let mut connection = self.connection()?;
        Ok(diesel::delete(clients::table.find(id)).execute(&mut connection)? > 0)
    }

    fn salons(&self) -> Result<Vec<Salon>> {
        let mut connection = self.connection()?;
        Ok(salons::table
            .select(Salon::as_select())
            .order(salons::id_salon.asc())
            .load(&mut connection)?)
    }

    fn salon(&self, id: i32) -> Result<Option<Salon>> {
        let mut connection = self.connection()?;
        Ok(salons::table
            .find(id)
            .select(Salon::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn insert_salon(&self, new_salon: NewSalon) -> Result<Salon> {
        let mut connection = self.connection()?;
        Ok(diesel::insert_into(salons::table)
            .values(&new_salon)
            .returning(Salon::as_returning())
            .get_result(&mut connection)?)
    }

    fn update_salon(&self, salon: Salon) -> Result<Option<Salon>> {
        let mut connection = self.connection()?;
        let id = salon.id;
        Ok(diesel::update(salons::table.find(id))
            .set(&NewSalon::from(salon))
            .returning(Salon::as_returning())
            .get_result(&mut connection)
            .optional()?)
    }

    fn delete_salon(&self, id: i32) -> Result<bool> {
        let mut connection = self.connection()?;
        Ok(diesel::delete(salons::table.find(id)).execute(&mut connection)? > 0)
    }

    fn stylists(&self) -> Result<Vec<Stylist>> {
        let mut connection = self.connection()?;
        Ok(coiffeurs::table
            .select(Stylist::as_select())
            .order(coiffeurs::id_coiffeur.asc())
            .load(&mut connection)?)
    }

    fn stylist(&self, id: i32) -> Result<Option<Stylist>> {
        let mut connection = self.connection()?;
        Ok(coiffeurs::table
            .find(id)
            .select(Stylist::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn insert_stylist(&self, new_stylist: NewStylist) -> Result<Stylist> {
        let mut connection = self.connection()?;
        Ok(diesel::insert_into(coiffeurs::table)
            .values(&new_stylist)
            .returning(Stylist::as_returning())
            .get_result(&mut connection)?)
    }

    fn update_stylist(&self, stylist: Stylist) -> Result<Option<Stylist>> {
        let mut connection = self.connection()?;
        let id = stylist.id;
        Ok(diesel::update(coiffeurs::table.find(id))
            .set(&NewStylist::from(stylist))
            .returning(Stylist::as_returning())
            .get_result(&mut connection)
            .optional()?)
    }

    fn delete_stylist(&self, id: i32) -> Result<bool> {
        let mut connection = self.connection()?;
        Ok(diesel::delete(coiffeurs::table.find(id)).execute(&mut connection)? > 0)
    }
}
