//! JSON-over-HTTP plumbing shared by the collaborator clients.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{RebookError, Result};

/// Response envelope used by every collaborator: `{status, msg, data}`.
///
/// `status == 1` is success; anything else is an empty or refused answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: i32,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: 1,
            msg: "Success".to_string(),
            data: Some(data),
        }
    }

    pub fn refused(msg: impl Into<String>) -> Self {
        Self {
            status: 0,
            msg: msg.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 1
    }

    /// The payload of a successful answer. `status=1` with `data: null` is
    /// still `None`.
    pub fn into_data(self) -> Option<T> {
        if self.is_success() { self.data } else { None }
    }
}

/// HTTP client bound to one collaborator.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    service: &'static str,
    base_url: String,
    client: Client,
}

impl ServiceClient {
    /// Creates a client whose every request is bounded by `timeout`.
    pub fn new(service: &'static str, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RebookError::unavailable(service, e.to_string()))?;

        Ok(Self {
            service,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>> {
        self.send(self.client.get(self.url(path))).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<Envelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<Envelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.client.put(self.url(path)).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>> {
        self.send(self.client.delete(self.url(path))).await
    }

    /// Non-2xx statuses and undecodable bodies are `ServiceUnavailable`.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Envelope<T>> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(service = self.service, %status, "collaborator answered with an error status");
            return Err(RebookError::unavailable(self.service, format!("HTTP {status}")));
        }

        response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, err: reqwest::Error) -> RebookError {
        if err.is_timeout() {
            metrics::counter!("gateway_timeouts_total", "service" => self.service).increment(1);
        }
        tracing::warn!(service = self.service, error = %err, "collaborator call failed");
        RebookError::unavailable(self.service, err.to_string())
    }
}

/// Turns a refused mutation into `ServiceUnavailable`.
pub(crate) fn accepted<T>(service: &'static str, envelope: Envelope<T>) -> Result<()> {
    if envelope.is_success() {
        Ok(())
    } else {
        Err(RebookError::unavailable(service, envelope.msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_data_is_empty_even_on_success() {
        let envelope: Envelope<String> =
            serde_json::from_str(r#"{"status":1,"msg":"ok","data":null}"#).unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.into_data(), None);
    }

    #[test]
    fn refused_status_hides_data() {
        let envelope: Envelope<String> =
            serde_json::from_str(r#"{"status":0,"msg":"no","data":"stale"}"#).unwrap();
        assert_eq!(envelope.into_data(), None);
    }

    #[test]
    fn missing_msg_and_data_decode() {
        let envelope: Envelope<String> = serde_json::from_str(r#"{"status":1}"#).unwrap();
        assert_eq!(envelope.msg, "");
        assert_eq!(envelope.into_data(), None);
    }

    #[test]
    fn accepted_maps_refusal() {
        assert!(accepted("order", Envelope::ok(())).is_ok());
        let err = accepted("order", Envelope::<()>::refused("Order already exist")).unwrap_err();
        assert_eq!(err.code(), "SERVICE_UNAVAILABLE");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ServiceClient::new("seat", "http://localhost:18898/", Duration::from_secs(1))
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:18898");
        assert_eq!(client.url("/seats"), "http://localhost:18898/seats");
    }
}
