use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::Error as FailsafeError;
use reqwest::{Client, StatusCode};

use super::{
    build_circuit_breaker, build_http_client, resource_url, LookupCircuitBreaker, LookupSettings,
};
use crate::error::LookupError;
use crate::ports::{AccountInfo, AccountLookup, LookupResult};
use crate::utils::sanitize::mask_identifier;

/// HTTP client for the account lookup service
#[derive(Clone)]
pub struct HttpAccountLookup {
    client: Client,
    base_url: String,
    circuit_breaker: LookupCircuitBreaker,
}

impl HttpAccountLookup {
    pub fn new(base_url: String) -> Self {
        Self::with_settings(base_url, LookupSettings::default())
    }

    pub fn with_settings(base_url: String, settings: LookupSettings) -> Self {
        HttpAccountLookup {
            client: build_http_client(settings.timeout),
            base_url,
            circuit_breaker: build_circuit_breaker(&settings),
        }
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }
}

#[async_trait]
impl AccountLookup for HttpAccountLookup {
    async fn get_account_info(&self, account_number: &str) -> LookupResult<AccountInfo> {
        let url = resource_url(&self.base_url, "accounts", account_number.trim())
            .map_err(LookupError::Transport)?;
        let client = self.client.clone();
        let account = account_number.trim().to_string();

        tracing::debug!("Fetching account info for {}", mask_identifier(&account));

        // Not-found answers are valid responses and must not trip the breaker.
        let result = self
            .circuit_breaker
            .call_with(
                |e: &LookupError| !e.is_not_found(),
                async move {
                    let response = client.get(url).send().await?;

                    if response.status() == StatusCode::NOT_FOUND {
                        return Err(LookupError::NotFound(account));
                    }
                    if !response.status().is_success() {
                        return Err(LookupError::Transport(format!(
                            "account lookup returned {}",
                            response.status()
                        )));
                    }

                    let info = response.json::<AccountInfo>().await?;
                    Ok(info)
                },
            )
            .await;

        match result {
            Ok(info) => Ok(info),
            Err(FailsafeError::Rejected) => Err(LookupError::CircuitOpen(
                "Account lookup circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_account_lookup_creation() {
        let client = HttpAccountLookup::new("https://accounts.internal".to_string());
        assert_eq!(client.base_url, "https://accounts.internal");
        assert_eq!(client.circuit_state(), "closed");
    }

    #[tokio::test]
    async fn test_get_account_info() {
        let mut server = mockito::Server::new_async().await;

        let body = r#"{
            "account": "ACC1",
            "fiNumber": "001",
            "branch": "00011",
            "accountType": "Personal",
            "accountCurrency": "CAD",
            "accountStatus": "Active",
            "accountOpen": "2019-04-01",
            "accountHolders": [ { "partyKey": "P1" }, { "partyKey": " P2 " } ]
        }"#;

        let _mock = server
            .mock("GET", "/accounts/ACC1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = HttpAccountLookup::new(server.url());
        let info = client.get_account_info("ACC1").await.unwrap();

        assert_eq!(info.account, "ACC1");
        assert_eq!(info.branch.as_deref(), Some("00011"));
        assert_eq!(info.holder_keys(), vec!["P1".to_string(), "P2".to_string()]);
    }

    #[tokio::test]
    async fn test_get_account_not_found() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/accounts/.*".into()))
            .with_status(404)
            .create_async()
            .await;

        let client = HttpAccountLookup::new(server.url());
        let result = client.get_account_info("MISSING").await;

        assert!(matches!(result, Err(LookupError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_not_found_does_not_open_circuit() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/accounts/.*".into()))
            .with_status(404)
            .expect(5)
            .create_async()
            .await;

        let settings = LookupSettings {
            timeout: Duration::from_secs(2),
            failure_threshold: 2,
            reset_timeout: Duration::from_secs(30),
        };
        let client = HttpAccountLookup::with_settings(server.url(), settings);

        for _ in 0..5 {
            let result = client.get_account_info("MISSING").await;
            assert!(matches!(result, Err(LookupError::NotFound(_))));
        }
        assert_eq!(client.circuit_state(), "closed");
    }

    #[tokio::test]
    async fn test_circuit_opens_after_server_errors() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/accounts/.*".into()))
            .with_status(500)
            .expect_at_least(2)
            .create_async()
            .await;

        let settings = LookupSettings {
            timeout: Duration::from_secs(2),
            failure_threshold: 2,
            reset_timeout: Duration::from_secs(30),
        };
        let client = HttpAccountLookup::with_settings(server.url(), settings);

        for _ in 0..2 {
            let result = client.get_account_info("ACC1").await;
            assert!(matches!(result, Err(LookupError::Transport(_))));
        }

        let result = client.get_account_info("ACC1").await;
        assert!(matches!(result, Err(LookupError::CircuitOpen(_))));
    }
}
