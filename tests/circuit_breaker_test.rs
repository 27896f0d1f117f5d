use std::time::Duration;

use str_review_core::clients::{HttpAccountLookup, HttpPartyLookup, LookupSettings};
use str_review_core::error::{ErrorKind, LookupError};
use str_review_core::ports::{AccountLookup, PartyLookup};

fn settings(failure_threshold: u32) -> LookupSettings {
    LookupSettings {
        timeout: Duration::from_secs(5),
        failure_threshold,
        reset_timeout: Duration::from_secs(60),
    }
}

#[tokio::test]
async fn test_circuit_breaker_state() {
    let client = HttpAccountLookup::new("https://accounts.internal".to_string());

    // Initially, circuit should be closed
    assert_eq!(client.circuit_state(), "closed");
}

#[tokio::test]
async fn test_circuit_opens_after_consecutive_failures() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/accounts/ACC1")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let client = HttpAccountLookup::with_settings(server.url(), settings(2));

    for _ in 0..2 {
        let err = client.get_account_info("ACC1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
    assert_eq!(client.circuit_state(), "open");

    let err = client.get_account_info("ACC1").await.unwrap_err();
    assert!(matches!(err, LookupError::CircuitOpen(_)));
    assert_eq!(err.kind(), ErrorKind::Transport);

    // The rejected call never reached the server.
    mock.assert_async().await;
}

#[tokio::test]
async fn test_not_found_does_not_trip_the_breaker() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/parties/P404")
        .with_status(404)
        .expect(3)
        .create_async()
        .await;

    let client = HttpPartyLookup::with_settings(server.url(), settings(2));

    for _ in 0..3 {
        let err = client.get_party_info("P404").await.unwrap_err();
        assert!(err.is_not_found());
    }
    assert_eq!(client.circuit_state(), "closed");
    mock.assert_async().await;
}
