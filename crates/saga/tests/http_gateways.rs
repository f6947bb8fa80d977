//! HTTP gateway clients against a local stub of the collaborators.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use common::{ActorId, OrderId};
use domain::{Money, SeatClass, Shard, TripId};
use saga::services::{Envelope, LedgerRequest, SeatRequest, TripDetailQuery, Withdrawal};
use saga::{
    HttpLedger, HttpOrderStore, HttpSeatAllocator, HttpTripFareGateway, Ledger, OrderStore,
    SeatAllocator, TripFareGateway,
};
use serde_json::{Value, json};

type Reply = Json<Envelope<Value>>;

fn ok(data: Value) -> Reply {
    Json(Envelope::ok(data))
}

fn refused(msg: &str) -> Reply {
    Json(Envelope::refused(msg))
}

async fn trip_detail(Json(query): Json<Value>) -> Reply {
    if query["tripId"] != "K1345" {
        return refused("Trip not found");
    }
    ok(json!({
        "tripId": "K1345",
        "trainType": "KuaiSu",
        "routeId": "route-2",
        "from": query["from"],
        "to": query["to"],
        "departureTime": "14:00:00",
        "distance": "250"
    }))
}

async fn price(Path((route, train_type)): Path<(String, String)>) -> Reply {
    if route != "route-2" || train_type != "KuaiSu" {
        return refused("No price");
    }
    ok(json!({
        "routeId": route,
        "trainType": train_type,
        "basicPriceRate": "0.38",
        "firstClassPriceRate": "0.6"
    }))
}

async fn seats(Json(request): Json<Value>) -> Reply {
    if request["seatClass"] == 2 {
        return refused("Sold out");
    }
    ok(json!({ "seatNumber": "Economy-7" }))
}

async fn withdraw(Json(request): Json<Value>) -> Reply {
    let amount: Money = request["amount"].as_str().unwrap().parse().unwrap();
    if amount > Money::parse("100").unwrap() {
        return refused("Insufficient balance");
    }
    ok(json!(true))
}

async fn find_order(Path(id): Path<String>) -> Reply {
    if id == KNOWN_ORDER {
        ok(order_json())
    } else {
        Json(Envelope {
            status: 1,
            msg: "No content".into(),
            data: None,
        })
    }
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn slow() -> Reply {
    tokio::time::sleep(Duration::from_secs(2)).await;
    ok(json!(true))
}

const KNOWN_ORDER: &str = "5ad7750b-a68b-49c0-a8c0-32776b067703";

fn order_json() -> Value {
    json!({
        "id": KNOWN_ORDER,
        "accountId": "4d2a46c7-71cb-4cf1-b5bb-b68406d9da6f",
        "trainNumber": "G1234",
        "fromStation": "shanghai",
        "toStation": "nanjing",
        "travelDate": "2026-05-04",
        "travelTime": "09:00:00",
        "seatClass": 2,
        "seatNumber": "FirstClass-30",
        "price": "250.0",
        "differenceMoney": "0.0",
        "status": 1,
        "documentType": 1,
        "contactsName": "Contacts_One",
        "contactsDocumentNumber": "DocumentNumber_One",
        "boughtDate": "2026-04-01T08:00:00Z"
    })
}

async fn spawn_stub() -> SocketAddr {
    let app = Router::new()
        .route("/trip_detail", post(trip_detail))
        .route("/prices/{route}/{train_type}", get(price))
        .route("/seats", post(seats))
        .route("/ledger/withdraw", post(withdraw))
        .route("/ledger/refund", post(broken))
        .route("/order/{id}", get(find_order))
        .route("/orderOther", post(|| async { refused("Order already exist") }))
        .route("/orderOther/{id}", get(slow));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn base(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

fn query(trip: &str) -> TripDetailQuery {
    TripDetailQuery {
        trip_id: TripId::new(trip),
        travel_date: NaiveDate::from_ymd_opt(2026, 5, 6).unwrap(),
        from: "shanghai".into(),
        to: "nanjing".into(),
    }
}

#[tokio::test]
async fn trip_and_price_lookups() {
    let addr = spawn_stub().await;
    let url = base(addr);
    let gateway = HttpTripFareGateway::new(&url, &url, Duration::from_secs(1)).unwrap();

    let detail = gateway.trip_detail(&query("K1345")).await.unwrap().unwrap();
    assert_eq!(detail.route_id, "route-2");
    assert!(gateway.trip_detail(&query("Z9")).await.unwrap().is_none());

    let record = gateway.price("route-2", "KuaiSu").await.unwrap().unwrap();
    let quote = detail.priced(&record.rate());
    assert_eq!(quote.fare_for(SeatClass::Economy).unwrap().to_string(), "95.0");
    assert!(gateway.price("route-9", "KuaiSu").await.unwrap().is_none());
}

#[tokio::test]
async fn refused_seat_is_no_capacity() {
    let addr = spawn_stub().await;
    let seats = HttpSeatAllocator::new(&base(addr), Duration::from_secs(1)).unwrap();
    let mut request = SeatRequest {
        trip_id: TripId::new("K1345"),
        travel_date: NaiveDate::from_ymd_opt(2026, 5, 6).unwrap(),
        seat_class: SeatClass::Economy,
        from: "shanghai".into(),
        to: "nanjing".into(),
    };

    let seat = seats.reserve(&request).await.unwrap().unwrap();
    assert_eq!(seat.seat_number, "Economy-7");

    request.seat_class = SeatClass::Comfort;
    assert!(seats.reserve(&request).await.unwrap().is_none());
}

#[tokio::test]
async fn ledger_refusal_and_server_error() {
    let addr = spawn_stub().await;
    let ledger = HttpLedger::new(&base(addr), Duration::from_secs(1)).unwrap();
    let small = LedgerRequest::new(ActorId::new(), OrderId::new(), Money::parse("40").unwrap());
    let large = LedgerRequest::new(ActorId::new(), OrderId::new(), Money::parse("400").unwrap());

    assert_eq!(ledger.withdraw(&small).await.unwrap(), Withdrawal::Debited);
    assert_eq!(
        ledger.withdraw(&large).await.unwrap(),
        Withdrawal::InsufficientFunds
    );

    let err = ledger.refund(&small).await.unwrap_err();
    assert_eq!(err.code(), "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn order_partitions_by_path() {
    let addr = spawn_stub().await;
    let url = base(addr);
    let store = HttpOrderStore::new(&url, &url, Duration::from_millis(200)).unwrap();
    let id = OrderId::parse(KNOWN_ORDER).unwrap();

    let order = store.find(Shard::Primary, id).await.unwrap().unwrap();
    assert_eq!(order.train_number, TripId::new("G1234"));
    assert_eq!(order.price.to_string(), "250.0");
    assert!(store.find(Shard::Primary, OrderId::new()).await.unwrap().is_none());

    // Refused insert
    let err = store.create(Shard::Secondary, &order).await.unwrap_err();
    assert_eq!(err.code(), "SERVICE_UNAVAILABLE");

    // Slower than the client timeout
    let err = store.find(Shard::Secondary, id).await.unwrap_err();
    assert_eq!(err.code(), "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn unreachable_collaborator_is_unavailable() {
    let ledger = HttpLedger::new("http://127.0.0.1:1", Duration::from_millis(200)).unwrap();
    let request = LedgerRequest::new(ActorId::new(), OrderId::new(), Money::parse("1").unwrap());

    let err = ledger.withdraw(&request).await.unwrap_err();
    assert_eq!(err.code(), "SERVICE_UNAVAILABLE");
}
