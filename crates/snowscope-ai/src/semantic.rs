//! Semantic model generation through an external API
//!
//! The service receives the selected tables and columns and answers with a
//! JSON document (typically `semantic_model_yaml`, `suggestions`, `warnings`
//! and `sqls_to_run`), which is returned as-is.

use crate::error::{AiError, Result};
use serde::Serialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Tables and columns to model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SemanticModelInputs {
    pub tables: Vec<String>,
    pub columns: Vec<String>,
}

#[derive(Serialize)]
struct Payload<'a> {
    inputs: &'a SemanticModelInputs,
}

/// Client for a semantic model generation endpoint
#[derive(Debug, Clone)]
pub struct SemanticModelClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl SemanticModelClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AiError::NotConfigured(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }

    /// POST the inputs and return the response document
    pub async fn generate(&self, inputs: &SemanticModelInputs) -> Result<serde_json::Value> {
        tracing::info!(
            tables = inputs.tables.len(),
            columns = inputs.columns.len(),
            "Requesting semantic model"
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&Payload { inputs })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AiError::RequestError(format!("Error calling semantic model API: {}", e)))?;

        response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(format!("Error calling semantic model API: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/semantic-model", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received).to_string();
                if n == 0 || text.trim_end().ends_with('}') {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&received).to_string()
        });

        (url, handle)
    }

    #[tokio::test]
    async fn posts_inputs_with_bearer_token() {
        let (url, server) = serve_once("200 OK", r#"{"semantic_model_yaml":"name: m","warnings":[]}"#).await;

        let client = SemanticModelClient::new(url, "key-123").unwrap();
        let inputs = SemanticModelInputs {
            tables: vec!["ANALYTICS.MARTS.FCT_ORDERS".to_string()],
            columns: vec!["AMOUNT".to_string()],
        };

        let response = client.generate(&inputs).await.unwrap();
        assert_eq!(response["semantic_model_yaml"], "name: m");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /semantic-model"));
        assert!(request.to_lowercase().contains("authorization: bearer key-123"));
        assert!(request.contains(
            r#"{"inputs":{"tables":["ANALYTICS.MARTS.FCT_ORDERS"],"columns":["AMOUNT"]}}"#
        ));
    }

    #[tokio::test]
    async fn error_status_is_request_error() {
        let (url, _server) = serve_once("500 Internal Server Error", "{}").await;

        let client = SemanticModelClient::new(url, "key-123").unwrap();
        let result = client.generate(&SemanticModelInputs::default()).await;

        match result {
            Err(AiError::RequestError(message)) => {
                assert!(message.starts_with("Error calling semantic model API"))
            }
            other => panic!("Expected RequestError, got {:?}", other),
        }
    }
}
