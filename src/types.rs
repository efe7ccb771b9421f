use crate::schema::{clients, coiffeurs, creneaux, reservations, salons};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A bookable time window of one stylist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = creneaux, check_for_backend(diesel::pg::Pg))]
pub struct Slot {
    #[diesel(column_name = id_creneau)]
    pub id: i32,
    #[diesel(column_name = id_coiffeur)]
    pub stylist_id: i32,
    pub datetime: DateTime<Utc>,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Insertable)]
#[diesel(table_name = creneaux)]
pub struct NewSlot {
    #[validate(range(min = 1))]
    #[diesel(column_name = id_coiffeur)]
    pub stylist_id: i32,
    pub datetime: DateTime<Utc>,
}

/// Administrative changes to a slot. Availability is only moved by claim and release.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, AsChangeset)]
#[diesel(table_name = creneaux)]
pub struct SlotChanges {
    #[validate(range(min = 1))]
    #[diesel(column_name = id_coiffeur)]
    pub stylist_id: Option<i32>,
    pub datetime: Option<DateTime<Utc>>,
}

impl SlotChanges {
    pub fn is_empty(&self) -> bool {
        self.stylist_id.is_none() && self.datetime.is_none()
    }
}

/// A confirmed booking holding exactly one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = reservations, check_for_backend(diesel::pg::Pg))]
pub struct Reservation {
    #[diesel(column_name = id_reservation)]
    pub id: i32,
    #[diesel(column_name = id_salon)]
    pub salon_id: i32,
    #[diesel(column_name = id_coiffeur)]
    pub stylist_id: i32,
    #[diesel(column_name = id_creneau)]
    pub slot_id: i32,
}

/// Booking request body, inserted as-is once the slot is claimed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate, Insertable)]
#[diesel(table_name = reservations)]
pub struct NewReservation {
    #[validate(range(min = 1))]
    #[diesel(column_name = id_salon)]
    pub salon_id: i32,
    #[validate(range(min = 1))]
    #[diesel(column_name = id_coiffeur)]
    pub stylist_id: i32,
    #[validate(range(min = 1))]
    #[diesel(column_name = id_creneau)]
    pub slot_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Queryable, Selectable)]
#[diesel(table_name = clients, check_for_backend(diesel::pg::Pg))]
pub struct Client {
    #[validate(range(min = 1))]
    #[diesel(column_name = id_client)]
    pub id: i32,
    #[validate(length(min = 1, max = 150))]
    pub firstname: String,
    #[validate(length(min = 1, max = 150))]
    pub lastname: String,
    #[validate(email, length(max = 150))]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Insertable, AsChangeset)]
#[diesel(table_name = clients)]
pub struct NewClient {
    #[validate(length(min = 1, max = 150))]
    pub firstname: String,
    #[validate(length(min = 1, max = 150))]
    pub lastname: String,
    #[validate(email, length(max = 150))]
    pub email: String,
}

impl From<Client> for NewClient {
    fn from(client: Client) -> Self {
        Self {
            firstname: client.firstname,
            lastname: client.lastname,
            email: client.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Queryable, Selectable)]
#[diesel(table_name = salons, check_for_backend(diesel::pg::Pg))]
pub struct Salon {
    #[validate(range(min = 1))]
    #[diesel(column_name = id_salon)]
    pub id: i32,
    #[validate(length(min = 1, max = 150))]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Insertable, AsChangeset)]
#[diesel(table_name = salons)]
pub struct NewSalon {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
}

impl From<Salon> for NewSalon {
    fn from(salon: Salon) -> Self {
        Self { name: salon.name }
    }
}

/// A hairdresser ("coiffeur") working at one salon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Queryable, Selectable)]
#[diesel(table_name = coiffeurs, check_for_backend(diesel::pg::Pg))]
pub struct Stylist {
    #[validate(range(min = 1))]
    #[diesel(column_name = id_coiffeur)]
    pub id: i32,
    #[validate(range(min = 1))]
    #[diesel(column_name = id_salon)]
    pub salon_id: i32,
    #[validate(length(min = 1, max = 150))]
    pub firstname: String,
    #[validate(length(min = 1, max = 150))]
    pub lastname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Insertable, AsChangeset)]
#[diesel(table_name = coiffeurs)]
pub struct NewStylist {
    #[validate(range(min = 1))]
    #[diesel(column_name = id_salon)]
    pub salon_id: i32,
    #[validate(length(min = 1, max = 150))]
    pub firstname: String,
    #[validate(length(min = 1, max = 150))]
    pub lastname: String,
}

impl From<Stylist> for NewStylist {
    fn from(stylist: Stylist) -> Self {
        Self {
            salon_id: stylist.salon_id,
            firstname: stylist.firstname,
            lastname: stylist.lastname,
        }
    }
}
