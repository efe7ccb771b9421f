use crate::{
    backend::Store,
    error::BookingError,
    reservation_engine::{ReconcileReport, ReservationEngine},
    slot_registry::SlotRegistry,
    types::{
        Client, NewClient, NewReservation, NewSalon, NewSlot, NewStylist, Reservation, Salon,
        Slot, SlotChanges, Stylist,
    },
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;
use validator::Validate;

type HttpResult<T> = Result<T, BookingError>;

#[derive(Clone)]
pub struct AppState<S: Store> {
    pub store: S,
    pub registry: SlotRegistry<S>,
    pub engine: ReservationEngine<S>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S) -> Self {
        let registry = SlotRegistry::new(store.clone());
        let engine = ReservationEngine::new(store.clone(), registry.clone());
        Self {
            store,
            registry,
            engine,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReservationIdQuery {
    id_reservation: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SlotIdQuery {
    id_creneau: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClientIdQuery {
    id_client: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SalonIdQuery {
    id_salon: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StylistIdQuery {
    id_coiffeur: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UpdateSlotRequest {
    id: i32,
    #[serde(flatten)]
    changes: SlotChanges,
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = match &self {
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::SlotUnavailable(_) | BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::Storage(_) | BookingError::Inconsistency { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!(err = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for BookingError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for BookingError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Runs a store operation on the blocking pool.
///
/// The spawned task runs to completion even if the request is dropped, so a
/// booking is never interrupted between claim and insert.
async fn run_blocking<T, F>(operation: F) -> HttpResult<T>
where
    F: FnOnce() -> HttpResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|err| BookingError::Storage(format!("storage task failed: {err}")))?
}

fn positive_id(id: i32, name: &str) -> HttpResult<i32> {
    if id < 1 {
        return Err(BookingError::Validation(format!("invalid {name} {id}")));
    }
    Ok(id)
}

pub fn create_app<S: Store>(state: AppState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let booking = Router::new()
        .route(
            "/reservations",
            get(get_reservations::<S>)
                .post(book_reservation::<S>)
                .delete(cancel_reservation::<S>),
        )
        .route(
            "/creneaux",
            get(get_slots::<S>)
                .post(create_slot::<S>)
                .put(update_slot::<S>)
                .delete(delete_slot::<S>),
        )
        .route("/creneaux/stream", get(stream_slots::<S>))
        .route("/reconcile", post(reconcile::<S>));

    let entities = Router::new()
        .route(
            "/clients",
            get(get_clients::<S>)
                .post(add_client::<S>)
                .put(update_client::<S>)
                .delete(delete_client::<S>),
        )
        .route(
            "/salons",
            get(get_salons::<S>)
                .post(add_salon::<S>)
                .put(update_salon::<S>)
                .delete(delete_salon::<S>),
        )
        .route(
            "/coiffeurs",
            get(get_stylists::<S>)
                .post(add_stylist::<S>)
                .put(update_stylist::<S>)
                .delete(delete_stylist::<S>),
        );

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(booking)
        .merge(entities)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn get_reservations<S: Store>(
    State(state): State<AppState<S>>,
) -> HttpResult<Json<Vec<Reservation>>> {
    let reservations = run_blocking(move || state.engine.reservations()).await?;
    Ok(Json(reservations))
}

async fn book_reservation<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewReservation>, JsonRejection>,
) -> HttpResult<(StatusCode, Json<Reservation>)> {
    let Json(request) = payload?;
    let reservation = run_blocking(move || state.engine.book(request)).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

async fn cancel_reservation<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<ReservationIdQuery>, QueryRejection>,
) -> HttpResult<Json<Reservation>> {
    let Query(query) = query?;
    let reservation = run_blocking(move || state.engine.cancel(query.id_reservation)).await?;
    Ok(Json(reservation))
}

async fn reconcile<S: Store>(State(state): State<AppState<S>>) -> HttpResult<Json<ReconcileReport>> {
    let report = run_blocking(move || state.engine.reconcile()).await?;
    Ok(Json(report))
}

async fn get_slots<S: Store>(State(state): State<AppState<S>>) -> HttpResult<Json<Vec<Slot>>> {
    let slots = run_blocking(move || state.registry.list()).await?;
    Ok(Json(slots))
}

async fn create_slot<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewSlot>, JsonRejection>,
) -> HttpResult<(StatusCode, Json<Slot>)> {
    let Json(new_slot) = payload?;
    let slot = run_blocking(move || state.registry.create(new_slot)).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

async fn update_slot<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<UpdateSlotRequest>, JsonRejection>,
) -> HttpResult<Json<Slot>> {
    let Json(request) = payload?;
    let id = positive_id(request.id, "slot id")?;
    let slot = run_blocking(move || state.registry.update(id, request.changes)).await?;
    Ok(Json(slot))
}

async fn delete_slot<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<SlotIdQuery>, QueryRejection>,
) -> HttpResult<(StatusCode, String)> {
    let Query(query) = query?;
    let id = positive_id(query.id_creneau, "slot id")?;
    run_blocking(move || state.registry.delete(id)).await?;
    Ok((StatusCode::OK, "Slot removed successfully".to_string()))
}

async fn stream_slots<S: Store>(
    State(state): State<AppState<S>>,
) -> HttpResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let slot_stream = run_blocking(move || Ok(state.registry.subscribe())).await?;
    let events = slot_stream.map(|slots| Event::default().event("creneaux").json_data(slots));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn get_clients<S: Store>(State(state): State<AppState<S>>) -> HttpResult<Json<Vec<Client>>> {
    let clients = run_blocking(move || state.store.clients()).await?;
    Ok(Json(clients))
}

async fn add_client<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewClient>, JsonRejection>,
) -> HttpResult<(StatusCode, Json<Client>)> {
    let Json(new_client) = payload?;
    new_client.validate()?;
    let client = run_blocking(move || state.store.insert_client(new_client)).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

async fn update_client<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<Client>, JsonRejection>,
) -> HttpResult<Json<Client>> {
    let Json(client) = payload?;
    client.validate()?;
    let id = client.id;
    let client = run_blocking(move || state.store.update_client(client))
        .await?
        .ok_or_else(|| BookingError::not_found("client", id))?;
    Ok(Json(client))
}

async fn delete_client<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<ClientIdQuery>, QueryRejection>,
) -> HttpResult<(StatusCode, String)> {
    let Query(query) = query?;
    let id = positive_id(query.id_client, "client id")?;
    if !run_blocking(move || state.store.delete_client(id)).await? {
        return Err(BookingError::not_found("client", id));
    }
    Ok((StatusCode::OK, "Client removed successfully".to_string()))
}

async fn get_salons<S: Store>(State(state): State<AppState<S>>) -> HttpResult<Json<Vec<Salon>>> {
    let salons = run_blocking(move || state.store.salons()).await?;
    Ok(Json(salons))
}

async fn add_salon<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewSalon>, JsonRejection>,
) -> HttpResult<(StatusCode, Json<Salon>)> {
    let Json(new_salon) = payload?;
    new_salon.validate()?;
    let salon = run_blocking(move || state.store.insert_salon(new_salon)).await?;
    Ok((StatusCode::CREATED, Json(salon)))
}

async fn update_salon<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<Salon>, JsonRejection>,
) -> HttpResult<Json<Salon>> {
    let Json(salon) = payload?;
    salon.validate()?;
    let id = salon.id;
    let salon = run_blocking(move || state.store.update_salon(salon))
        .await?
        .ok_or_else(|| BookingError::not_found("salon", id))?;
    Ok(Json(salon))
}

async fn delete_salon<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<SalonIdQuery>, QueryRejection>,
) -> HttpResult<(StatusCode, String)> {
    let Query(query) = query?;
    let id = positive_id(query.id_salon, "salon id")?;
    if !run_blocking(move || state.store.delete_salon(id)).await? {
        return Err(BookingError::not_found("salon", id));
    }
    Ok((StatusCode::OK, "Salon removed successfully".to_string()))
}

async fn get_stylists<S: Store>(State(state): State<AppState<S>>) -> HttpResult<Json<Vec<Stylist>>> {
    let stylists = run_blocking(move || state.store.stylists()).await?;
    Ok(Json(stylists))
}

async fn add_stylist<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewStylist>, JsonRejection>,
) -> HttpResult<(StatusCode, Json<Stylist>)> {
    let Json(new_stylist) = payload?;
    new_stylist.validate()?;
    let stylist = run_blocking(move || {
        if state.store.salon(new_stylist.salon_id)?.is_none() {
            return Err(BookingError::not_found("salon", new_stylist.salon_id));
        }
        state.store.insert_stylist(new_stylist)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(stylist)))
}

async fn update_stylist<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<Stylist>, JsonRejection>,
) -> HttpResult<Json<Stylist>> {
    let Json(stylist) = payload?;
    stylist.validate()?;
    let id = stylist.id;
    let stylist = run_blocking(move || {
        if state.store.salon(stylist.salon_id)?.is_none() {
            return Err(BookingError::not_found("salon", stylist.salon_id));
        }
        state.store.update_stylist(stylist)
    })
    .await?
    .ok_or_else(|| BookingError::not_found("stylist", id))?;
    Ok(Json(stylist))
}

async fn delete_stylist<S: Store>(
    State(state): State<AppState<S>>,
    query: Result<Query<StylistIdQuery>, QueryRejection>,
) -> HttpResult<(StatusCode, String)> {
    let Query(query) = query?;
    let id = positive_id(query.id_coiffeur, "stylist id")?;
    if !run_blocking(move || state.store.delete_stylist(id)).await? {
        return Err(BookingError::not_found("stylist", id));
    }
    Ok((StatusCode::OK, "Stylist removed successfully".to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        backend::{EntityStore, SlotStore},
        local_store::LocalStore,
        testutils::{assert_slot_invariant, seed_salon_with_stylist},
    };
    use chrono::{Duration, Utc};
    use reqwest::Client as HttpClient;
    use serde_json::Value;
    use tokio::task::JoinHandle;

    struct TestServer {
        server: JoinHandle<()>,
        url: String,
        store: LocalStore,
        client: HttpClient,
    }

    impl TestServer {
        async fn start() -> Self {
            let store = LocalStore::default();
            let app = create_app(AppState::new(store.clone()));
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}", listener.local_addr().unwrap());
            let server = tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            Self {
                server,
                url,
                store,
                client: HttpClient::new(),
            }
        }

        /// Seeds salon 1, stylist 1 and slot 1.
        async fn start_seeded() -> Self {
            let test_server = Self::start().await;
            let (_, stylist) = seed_salon_with_stylist(&test_server.store);
            test_server
                .store
                .insert_slot(NewSlot {
                    stylist_id: stylist.id,
                    datetime: Utc::now() + Duration::days(1),
                })
                .unwrap();
            test_server
        }

        fn url(&self, path: &str) -> String {
            format!("{}/{path}", self.url)
        }

        async fn book(&self, slot_id: i32) -> reqwest::Response {
            self.client
                .post(self.url("reservations"))
                .json(&json!({ "salon_id": 1, "stylist_id": 1, "slot_id": slot_id }))
                .send()
                .await
                .unwrap()
        }

        async fn slots(&self) -> Vec<Slot> {
            self.client
                .get(self.url("creneaux"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap()
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            self.server.abort();
        }
    }

    #[tokio::test]
    async fn test_booking_scenario() {
        let test_server = TestServer::start_seeded().await;

        let response = test_server.book(1).await;
        assert_eq!(response.status().as_u16(), StatusCode::CREATED.as_u16());
        let reservation: Reservation = response.json().await.unwrap();
        assert_eq!(reservation.slot_id, 1);
        assert!(!test_server.slots().await[0].available);

        let response = test_server.book(1).await;
        assert_eq!(response.status().as_u16(), StatusCode::CONFLICT.as_u16());

        let reservations: Vec<Reservation> = test_server
            .client
            .get(test_server.url("reservations"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(reservations, vec![reservation.clone()]);

        let response = test_server
            .client
            .delete(test_server.url(&format!("reservations?id_reservation={}", reservation.id)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::OK.as_u16());
        assert!(test_server.slots().await[0].available);

        let response = test_server
            .client
            .delete(test_server.url(&format!("reservations?id_reservation={}", reservation.id)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::NOT_FOUND.as_u16());
        assert_slot_invariant(&test_server.store);
    }

    #[test_case::test_case("not json", StatusCode::BAD_REQUEST ; "malformed body")]
    #[test_case::test_case(r#"{"salon_id": 1, "stylist_id": 1}"#, StatusCode::BAD_REQUEST ; "missing slot")]
    #[test_case::test_case(r#"{"salon_id": 1, "stylist_id": 1, "slot_id": "one"}"#, StatusCode::BAD_REQUEST ; "wrong type")]
    #[test_case::test_case(r#"{"salon_id": 0, "stylist_id": 1, "slot_id": 1}"#, StatusCode::BAD_REQUEST ; "zero id")]
    #[test_case::test_case(r#"{"salon_id": 1, "stylist_id": 1, "slot_id": 99}"#, StatusCode::NOT_FOUND ; "unknown slot")]
    #[test_case::test_case(r#"{"salon_id": 99, "stylist_id": 1, "slot_id": 1}"#, StatusCode::NOT_FOUND ; "unknown salon")]
    #[test_case::test_case(r#"{"salon_id": 1, "stylist_id": 99, "slot_id": 1}"#, StatusCode::NOT_FOUND ; "unknown stylist")]
    #[tokio::test]
    async fn test_rejected_booking(body: &str, status_code: StatusCode) {
        let test_server = TestServer::start_seeded().await;

        let response = test_server
            .client
            .post(test_server.url("reservations"))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), status_code.as_u16());
        let error: Value = response.json().await.unwrap();
        assert!(error["error"].is_string());
        assert!(test_server.slots().await[0].available);
    }

    #[test_case::test_case("reservations" ; "reservation without id")]
    #[test_case::test_case("reservations?id_reservation=abc" ; "reservation with malformed id")]
    #[test_case::test_case("creneaux" ; "slot without id")]
    #[test_case::test_case("creneaux?id_creneau=0" ; "slot with zero id")]
    #[test_case::test_case("clients?id_client=-3" ; "client with negative id")]
    #[tokio::test]
    async fn test_malformed_delete(path: &str) {
        let test_server = TestServer::start_seeded().await;

        let response = test_server
            .client
            .delete(test_server.url(path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::BAD_REQUEST.as_u16());
    }

    #[tokio::test]
    async fn test_concurrent_booking_requests() {
        let test_server = TestServer::start_seeded().await;

        let (first, second) = tokio::join!(test_server.book(1), test_server.book(1));
        let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
        statuses.sort_unstable();

        assert_eq!(
            statuses,
            vec![StatusCode::CREATED.as_u16(), StatusCode::CONFLICT.as_u16()]
        );
        assert_slot_invariant(&test_server.store);
    }

    #[tokio::test]
    async fn test_reserved_slot_cannot_be_deleted() {
        let test_server = TestServer::start_seeded().await;
        let reservation: Reservation = test_server.book(1).await.json().await.unwrap();

        let response = test_server
            .client
            .delete(test_server.url("creneaux?id_creneau=1"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::CONFLICT.as_u16());
        assert_eq!(test_server.slots().await.len(), 1);

        test_server
            .client
            .delete(test_server.url(&format!("reservations?id_reservation={}", reservation.id)))
            .send()
            .await
            .unwrap();
        let response = test_server
            .client
            .delete(test_server.url("creneaux?id_creneau=1"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::OK.as_u16());
        assert!(test_server.slots().await.is_empty());
    }

    #[tokio::test]
    async fn test_slot_administration() {
        let test_server = TestServer::start_seeded().await;
        let datetime = Utc::now() + Duration::days(3);

        let response = test_server
            .client
            .post(test_server.url("creneaux"))
            .json(&json!({ "stylist_id": 1, "datetime": datetime }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::CREATED.as_u16());
        let slot: Slot = response.json().await.unwrap();
        assert!(slot.available);

        let moved = datetime + Duration::hours(1);
        let response = test_server
            .client
            .put(test_server.url("creneaux"))
            .json(&json!({ "id": slot.id, "datetime": moved }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::OK.as_u16());
        let updated: Slot = response.json().await.unwrap();
        assert_eq!(updated.datetime, moved);

        let cases = [
            (json!({ "id": slot.id }), StatusCode::BAD_REQUEST),
            (json!({ "id": slot.id, "stylist_id": 42 }), StatusCode::NOT_FOUND),
            (json!({ "id": 77, "datetime": moved }), StatusCode::NOT_FOUND),
        ];
        for (body, status_code) in cases {
            let response = test_server
                .client
                .put(test_server.url("creneaux"))
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status().as_u16(), status_code.as_u16(), "{body}");
        }

        let response = test_server
            .client
            .post(test_server.url("creneaux"))
            .json(&json!({ "stylist_id": 42, "datetime": datetime }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::NOT_FOUND.as_u16());
        assert_eq!(test_server.slots().await.len(), 2);
    }

    #[tokio::test]
    async fn test_entity_routes() {
        let test_server = TestServer::start().await;

        let response = test_server
            .client
            .post(test_server.url("salons"))
            .json(&json!({ "name": "Salon Montmartre" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::CREATED.as_u16());
        let salon: Salon = response.json().await.unwrap();

        let response = test_server
            .client
            .post(test_server.url("coiffeurs"))
            .json(&json!({ "salon_id": salon.id, "firstname": "Ines", "lastname": "Roux" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::CREATED.as_u16());
        let stylist: Stylist = response.json().await.unwrap();

        let response = test_server
            .client
            .post(test_server.url("coiffeurs"))
            .json(&json!({ "salon_id": 99, "firstname": "Ines", "lastname": "Roux" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::NOT_FOUND.as_u16());

        let stylists: Vec<Stylist> = test_server
            .client
            .get(test_server.url("coiffeurs"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(stylists, vec![stylist]);

        let response = test_server
            .client
            .delete(test_server.url(&format!("salons?id_salon={}", salon.id)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::CONFLICT.as_u16());

        let response = test_server
            .client
            .post(test_server.url("clients"))
            .json(&json!({ "firstname": "Paul", "lastname": "Bernard", "email": "not-an-email" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::BAD_REQUEST.as_u16());

        let response = test_server
            .client
            .put(test_server.url("clients"))
            .json(&json!({ "id": 5, "firstname": "Paul", "lastname": "Bernard", "email": "paul@example.com" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::NOT_FOUND.as_u16());
        assert!(test_server.store.clients().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_route() {
        let test_server = TestServer::start_seeded().await;
        test_server.store.claim_slot(1).unwrap();

        let response = test_server
            .client
            .post(test_server.url("reconcile"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::OK.as_u16());
        let report: Value = response.json().await.unwrap();
        assert_eq!(report["released"], json!([1]));
        assert!(test_server.slots().await[0].available);
    }

    #[tokio::test]
    async fn test_get_health() {
        let test_server = TestServer::start().await;

        let response = test_server
            .client
            .get(test_server.url("health"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::OK.as_u16());
    }
}
