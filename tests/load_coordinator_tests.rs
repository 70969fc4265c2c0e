mod support;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use petsit::error::{ErrorKind, SessionError};
use petsit::load::{LoadCoordinator, ResultModel, Slot};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::oneshot;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{session_for, signed_in, REFRESH_PATH};

type Gate = oneshot::Sender<Result<String, SessionError>>;

/// Producer that settles with whatever is sent through the returned gate.
fn gated() -> (
    Gate,
    impl std::future::Future<Output = Result<String, SessionError>> + Send + 'static,
) {
    let (tx, rx) = oneshot::channel();
    let producer = async move {
        rx.await
            .unwrap_or_else(|_| Err(SessionError::InvalidRequest("gate dropped".to_string())))
    };
    (tx, producer)
}

fn drain<T>(updates: &mut futures::stream::BoxStream<'static, ResultModel<T>>) -> Vec<ResultModel<T>> {
    let mut seen = Vec::new();
    while let Some(Some(model)) = updates.next().now_or_never() {
        seen.push(model);
    }
    seen
}

fn assert_no_consecutive_terminals<T: std::fmt::Debug>(states: &[ResultModel<T>]) {
    for pair in states.windows(2) {
        assert!(
            !(pair[0].is_terminal() && pair[1].is_terminal()),
            "consecutive terminal states: {pair:?}"
        );
    }
}

#[tokio::test]
async fn load_publishes_pending_then_success() {
    let loads: LoadCoordinator<String> = LoadCoordinator::new();
    let mut updates = loads.observe("sitters");

    loads
        .run("sitters", async { Ok("Maya".to_string()) })
        .await
        .unwrap();

    assert_eq!(
        drain(&mut updates),
        vec![
            ResultModel::Pending,
            ResultModel::Success("Maya".to_string())
        ]
    );
    assert!(!loads.is_active("sitters"));
}

#[tokio::test]
async fn failed_load_publishes_kind_and_detail() {
    let loads: LoadCoordinator<String> = LoadCoordinator::new();
    let mut updates = loads.observe("sitters");

    loads
        .run("sitters", async { Err(SessionError::http(409, "already booked")) })
        .await
        .unwrap();

    let states = drain(&mut updates);
    assert_eq!(states.len(), 2);
    assert_eq!(states[0], ResultModel::Pending);
    match &states[1] {
        ResultModel::Failure(kind, Some(detail)) => {
            assert_eq!(*kind, ErrorKind::Conflict);
            assert!(detail.contains("already booked"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn superseded_load_never_publishes() {
    let loads: LoadCoordinator<String> = LoadCoordinator::new();
    let mut updates = loads.observe("bookings");

    let (gate_a, producer_a) = gated();
    let first = loads.run("bookings", producer_a);
    tokio::task::yield_now().await;

    let (gate_b, producer_b) = gated();
    let second = loads.run("bookings", producer_b);

    gate_b.send(Ok("B".to_string())).unwrap();
    second.await.unwrap();
    first.await.unwrap();
    // A's producer was dropped on cancellation, so its gate is closed.
    assert!(gate_a.send(Ok("A".to_string())).is_err());

    let states = drain(&mut updates);
    assert_eq!(
        states,
        vec![
            ResultModel::Pending,
            ResultModel::Pending,
            ResultModel::Success("B".to_string())
        ]
    );
    assert_no_consecutive_terminals(&states);
}

#[tokio::test]
async fn rapid_resubmission_settles_once() {
    let loads: LoadCoordinator<u32> = LoadCoordinator::new();
    let mut updates = loads.observe("reviews");

    let handles: Vec<_> = (1..=5u32)
        .map(|n| loads.run("reviews", async move { Ok(n) }))
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let states = drain(&mut updates);
    let terminals: Vec<_> = states.iter().filter(|s| s.is_terminal()).collect();
    assert_eq!(terminals, vec![&ResultModel::Success(5)]);
    assert_eq!(states.last(), Some(&ResultModel::Success(5)));
    assert_no_consecutive_terminals(&states);
}

#[tokio::test]
async fn cancel_is_silent_and_drops_the_producer() {
    struct DropFlag(Arc<AtomicBool>);
    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    let loads: LoadCoordinator<String> = LoadCoordinator::new();
    let mut updates = loads.observe("profile");
    let dropped = Arc::new(AtomicBool::new(false));
    let flag = DropFlag(dropped.clone());

    let handle = loads.run("profile", async move {
        let _flag = flag;
        futures::future::pending::<()>().await;
        Ok("never".to_string())
    });
    tokio::task::yield_now().await;

    assert!(loads.cancel("profile"));
    handle.await.unwrap();

    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(drain(&mut updates), vec![ResultModel::Pending]);
    assert_eq!(loads.latest("profile"), Some(ResultModel::Pending));
    assert!(!loads.cancel("profile"));
}

#[tokio::test]
async fn slots_are_independent() {
    let loads: LoadCoordinator<String> = LoadCoordinator::new();
    let screen = Slot::new("sitter_profile");
    let reviews = screen.pane("reviews");
    let gallery = screen.pane("gallery");

    let (gate_reviews, producer_reviews) = gated();
    let reviews_load = loads.run(reviews.clone(), producer_reviews);
    let gallery_load = loads.run(gallery.clone(), async { Ok("3 photos".to_string()) });

    gallery_load.await.unwrap();
    assert!(loads.is_active(reviews.clone()));
    assert_eq!(
        loads.latest(gallery),
        Some(ResultModel::Success("3 photos".to_string()))
    );

    gate_reviews.send(Ok("5 stars".to_string())).unwrap();
    reviews_load.await.unwrap();
    assert_eq!(
        loads.latest(reviews),
        Some(ResultModel::Success("5 stars".to_string()))
    );
}

#[tokio::test]
async fn late_observer_gets_latest_state_first() {
    let loads: LoadCoordinator<String> = LoadCoordinator::new();
    loads
        .run("inbox", async { Ok("2 messages".to_string()) })
        .await
        .unwrap();

    let mut updates = loads.observe("inbox");
    assert_eq!(
        updates.next().await,
        Some(ResultModel::Success("2 messages".to_string()))
    );

    let (gate, producer) = gated();
    let handle = loads.run("inbox", producer);
    assert_eq!(updates.next().await, Some(ResultModel::Pending));
    gate.send(Ok("3 messages".to_string())).unwrap();
    handle.await.unwrap();
    assert_eq!(
        updates.next().await,
        Some(ResultModel::Success("3 messages".to_string()))
    );
}

async fn malformed_reviews() -> Result<String, SessionError> {
    panic!("malformed review payload")
}

#[tokio::test]
async fn panicking_load_settles_as_unknown_failure() {
    let loads: LoadCoordinator<String> = LoadCoordinator::new();
    let mut updates = loads.observe("reviews");

    loads.run("reviews", malformed_reviews()).await.unwrap();

    assert!(!loads.is_active("reviews"));
    let states = drain(&mut updates);
    assert_eq!(states.len(), 2);
    assert_eq!(states[0], ResultModel::Pending);
    assert_eq!(states[1].error_kind(), Some(ErrorKind::Unknown));

    loads
        .run("reviews", async { Ok("4 reviews".to_string()) })
        .await
        .unwrap();
    assert_eq!(
        loads.latest("reviews"),
        Some(ResultModel::Success("4 reviews".to_string()))
    );
}

#[tokio::test]
async fn forget_cancels_and_drops_the_slot() {
    let loads: LoadCoordinator<String> = LoadCoordinator::new();
    let mut updates = loads.observe("search");
    let (_gate, producer) = gated();
    let handle = loads.run("search", producer);

    loads.forget("search");
    handle.await.unwrap();

    assert_eq!(updates.next().await, Some(ResultModel::Pending));
    assert_eq!(updates.next().await, None);
    assert_eq!(loads.latest("search"), None);
    assert!(!loads.is_active("search"));
    assert!(!loads.cancel("search"));
}

#[tokio::test]
async fn screen_load_survives_token_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/walks"))
        .and(wiremock::matchers::header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("A2"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/walks"))
        .and(wiremock::matchers::header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"walks": 4})))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server, signed_in("A1", "R1"));
    let loads: LoadCoordinator<serde_json::Value> = LoadCoordinator::new();
    let mut updates = loads.observe("walks");

    let transport = session.transport().clone();
    loads
        .run("walks", async move { transport.get_json("/walks").await })
        .await
        .unwrap();

    assert_eq!(
        drain(&mut updates),
        vec![
            ResultModel::Pending,
            ResultModel::Success(json!({"walks": 4}))
        ]
    );
}
