diesel::table! {
    clients (id_client) {
        id_client -> Int4,
        firstname -> Varchar,
        lastname -> Varchar,
        email -> Varchar,
    }
}

diesel::table! {
    salons (id_salon) {
        id_salon -> Int4,
        name -> Varchar,
    }
}

diesel::table! {
    coiffeurs (id_coiffeur) {
        id_coiffeur -> Int4,
        id_salon -> Int4,
        firstname -> Varchar,
        lastname -> Varchar,
    }
}

diesel::table! {
    creneaux (id_creneau) {
        id_creneau -> Int4,
        id_coiffeur -> Int4,
        datetime -> Timestamptz,
        available -> Bool,
    }
}

diesel::table! {
    reservations (id_reservation) {
        id_reservation -> Int4,
        id_salon -> Int4,
        id_coiffeur -> Int4,
        id_creneau -> Int4,
    }
}

diesel::joinable!(coiffeurs -> salons (id_salon));
diesel::joinable!(creneaux -> coiffeurs (id_coiffeur));
diesel::joinable!(reservations -> creneaux (id_creneau));

diesel::allow_tables_to_appear_in_same_query!(clients, salons, coiffeurs, creneaux, reservations,);

/// Table bootstrap executed when the PostgreSQL store starts.
pub const BOOTSTRAP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS clients (
    id_client SERIAL PRIMARY KEY,
    firstname VARCHAR(150) NOT NULL,
    lastname VARCHAR(150) NOT NULL,
    email VARCHAR(150) NOT NULL
);

CREATE TABLE IF NOT EXISTS salons (
    id_salon SERIAL PRIMARY KEY,
    name VARCHAR(150) NOT NULL
);

CREATE TABLE IF NOT EXISTS coiffeurs (
    id_coiffeur SERIAL PRIMARY KEY,
    id_salon INT NOT NULL REFERENCES salons (id_salon),
    firstname VARCHAR(150) NOT NULL,
    lastname VARCHAR(150) NOT NULL
);

CREATE TABLE IF NOT EXISTS creneaux (
    id_creneau SERIAL PRIMARY KEY,
    id_coiffeur INT NOT NULL REFERENCES coiffeurs (id_coiffeur),
    datetime TIMESTAMPTZ NOT NULL,
    available BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS reservations (
    id_reservation SERIAL PRIMARY KEY,
    id_salon INT NOT NULL REFERENCES salons (id_salon),
    id_coiffeur INT NOT NULL REFERENCES coiffeurs (id_coiffeur),
    id_creneau INT NOT NULL UNIQUE REFERENCES creneaux (id_creneau)
);
"#;
