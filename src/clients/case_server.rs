use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

use super::{build_http_client, resource_url};
use crate::domain::case::{CaseSnapshot, SaveCaseRequest, SaveCaseResponse};
use crate::error::CaseServerError;
use crate::ports::CaseServer;

/// HTTP client for the case server
#[derive(Clone)]
pub struct HttpCaseServer {
    client: Client,
    base_url: String,
}

impl HttpCaseServer {
    pub fn new(base_url: String) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: String, timeout: Duration) -> Self {
        HttpCaseServer {
            client: build_http_client(timeout),
            base_url,
        }
    }

    fn case_url(&self, aml_id: &str) -> Result<Url, CaseServerError> {
        resource_url(&self.base_url, "cases", aml_id).map_err(CaseServerError::Transport)
    }
}

#[async_trait]
impl CaseServer for HttpCaseServer {
    async fn fetch_case(&self, aml_id: &str) -> Result<CaseSnapshot, CaseServerError> {
        let response = self.client.get(self.case_url(aml_id)?).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(CaseServerError::NotFound(aml_id.to_string())),
            status if status.is_success() => Ok(response.json::<CaseSnapshot>().await?),
            status => Err(CaseServerError::Transport(format!(
                "GET case returned {}",
                status
            ))),
        }
    }

    async fn save_case(
        &self,
        aml_id: &str,
        request: &SaveCaseRequest,
    ) -> Result<SaveCaseResponse, CaseServerError> {
        let response = self
            .client
            .put(self.case_url(aml_id)?)
            .json(request)
            .send()
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Err(CaseServerError::VersionConflict {
                base_version: request.base_version,
            }),
            StatusCode::NOT_FOUND => Err(CaseServerError::NotFound(aml_id.to_string())),
            status if status.is_success() => Ok(response.json::<SaveCaseResponse>().await?),
            status => Err(CaseServerError::Transport(format!(
                "PUT case returned {}",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_case() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", "/cases/AML-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "version": 3,
                    "searchParams": { "accountNumbers": ["ACC1"] },
                    "transactions": [
                        { "flowOfFundsAmlTransactionId": "T1", "changeLogs": [] }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = HttpCaseServer::new(server.url());
        let snapshot = client.fetch_case("AML-1").await.unwrap();

        assert_eq!(snapshot.version, 3);
        assert_eq!(snapshot.transactions.len(), 1);
        assert_eq!(snapshot.search_params.account_numbers, vec!["ACC1".to_string()]);
    }

    #[tokio::test]
    async fn test_save_case_sends_base_version() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("PUT", "/cases/AML-1")
            .match_body(Matcher::PartialJson(json!({ "baseVersion": 3 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{ "newVersion": 4, "updatedAt": "2024-05-01T12:00:00Z" }"#)
            .create_async()
            .await;

        let client = HttpCaseServer::new(server.url());
        let request = SaveCaseRequest {
            base_version: 3,
            transactions: Vec::new(),
            parties: Vec::new(),
        };
        let response = client.save_case("AML-1", &request).await.unwrap();

        assert_eq!(response.new_version, 4);
        assert!(response.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_save_case_conflict() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("PUT", "/cases/AML-1")
            .with_status(409)
            .create_async()
            .await;

        let client = HttpCaseServer::new(server.url());
        let request = SaveCaseRequest {
            base_version: 2,
            transactions: Vec::new(),
            parties: Vec::new(),
        };
        let error = client.save_case("AML-1", &request).await.unwrap_err();

        assert_eq!(error, CaseServerError::VersionConflict { base_version: 2 });
    }

    #[tokio::test]
    async fn test_save_case_server_error_is_transport() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("PUT", "/cases/AML-1")
            .with_status(503)
            .create_async()
            .await;

        let client = HttpCaseServer::new(server.url());
        let request = SaveCaseRequest {
            base_version: 2,
            transactions: Vec::new(),
            parties: Vec::new(),
        };
        let error = client.save_case("AML-1", &request).await.unwrap_err();

        assert!(matches!(error, CaseServerError::Transport(_)));
    }
}
