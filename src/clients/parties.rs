use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::Error as FailsafeError;
use reqwest::{Client, StatusCode};

use super::{
    build_circuit_breaker, build_http_client, resource_url, LookupCircuitBreaker, LookupSettings,
};
use crate::error::LookupError;
use crate::ports::{LookupResult, PartyInfo, PartyLookup};
use crate::utils::sanitize::mask_identifier;

/// HTTP client for the party lookup service
#[derive(Clone)]
pub struct HttpPartyLookup {
    client: Client,
    base_url: String,
    circuit_breaker: LookupCircuitBreaker,
}

impl HttpPartyLookup {
    pub fn new(base_url: String) -> Self {
        Self::with_settings(base_url, LookupSettings::default())
    }

    pub fn with_settings(base_url: String, settings: LookupSettings) -> Self {
        HttpPartyLookup {
            client: build_http_client(settings.timeout),
            base_url,
            circuit_breaker: build_circuit_breaker(&settings),
        }
    }

    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }
}

#[async_trait]
impl PartyLookup for HttpPartyLookup {
    async fn get_party_info(&self, party_key: &str) -> LookupResult<PartyInfo> {
        let key = party_key.trim().to_string();
        let url = resource_url(&self.base_url, "parties", &key).map_err(LookupError::Transport)?;
        let client = self.client.clone();

        tracing::debug!("Fetching party info for {}", mask_identifier(&key));

        let result = self
            .circuit_breaker
            .call_with(
                |e: &LookupError| !e.is_not_found(),
                async move {
                    let response = client.get(url).send().await?;

                    if response.status() == StatusCode::NOT_FOUND {
                        return Err(LookupError::NotFound(key));
                    }
                    if !response.status().is_success() {
                        return Err(LookupError::Transport(format!(
                            "party lookup returned {}",
                            response.status()
                        )));
                    }

                    let info = response.json::<PartyInfo>().await?;
                    Ok(info)
                },
            )
            .await;

        match result {
            Ok(info) => Ok(info),
            Err(FailsafeError::Rejected) => Err(LookupError::CircuitOpen(
                "Party lookup circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_party_info() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", "/parties/P1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{ "surname": "Tremblay", "givenName": "Marie" }"#)
            .create_async()
            .await;

        let client = HttpPartyLookup::new(server.url());
        let info = client.get_party_info(" P1 ").await.unwrap();

        assert_eq!(info.surname.as_deref(), Some("Tremblay"));
        assert_eq!(info.given_name.as_deref(), Some("Marie"));
        assert_eq!(info.name_of_entity, None);
    }

    #[tokio::test]
    async fn test_party_key_is_one_path_segment() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/parties/A%2FB%3F1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{ "nameOfEntity": "Dépanneur Roy" }"#)
            .create_async()
            .await;

        let client = HttpPartyLookup::new(server.url());
        let info = client.get_party_info("A/B?1").await.unwrap();

        assert_eq!(info.name_of_entity.as_deref(), Some("Dépanneur Roy"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_party_not_found_is_distinguishable() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", "/parties/P404")
            .with_status(404)
            .create_async()
            .await;

        let client = HttpPartyLookup::new(server.url());
        let error = client.get_party_info("P404").await.unwrap_err();

        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_garbage_body_is_transport_class() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", "/parties/P1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let client = HttpPartyLookup::new(server.url());
        let error = client.get_party_info("P1").await.unwrap_err();

        assert!(!error.is_not_found());
        assert_eq!(error.kind(), crate::error::ErrorKind::Transport);
    }
}
