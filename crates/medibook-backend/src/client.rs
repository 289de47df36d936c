//! reqwest implementation of [`BookingBackend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use medibook_core::config::BackendConfig;
use medibook_core::{AppointmentRequest, AvailabilityRequest, Location, NluResult};

use crate::error::BackendError;
use crate::BookingBackend;

const API_KEY_HEADER: &str = "x-api-key";

/// HTTP client for the booking backend.
pub struct HttpBookingBackend {
    base_url: String,
    api_key: Option<String>,
    client: Client,
    timeout_secs: u64,
    health_timeout_secs: u64,
}

impl HttpBookingBackend {
    /// Build a client from the backend section of the configuration.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;

        let api_key = config.api_key.clone().filter(|k| !k.is_empty());
        match &api_key {
            Some(key) => tracing::info!(
                url = %config.base_url,
                key_len = key.len(),
                "Booking backend configured with API key"
            ),
            None => tracing::warn!(
                url = %config.base_url,
                "No backend API key configured; some endpoints may reject requests"
            ),
        }

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            timeout_secs: config.request_timeout_secs,
            health_timeout_secs: config.health_timeout_secs,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    /// Send a request and decode a JSON body, mapping transport failures.
    async fn send_json(&self, request: RequestBuilder, path: &str) -> Result<Value, BackendError> {
        tracing::debug!(path, "Backend request");
        let response = self
            .with_key(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        tracing::debug!(path, status = status.as_u16(), "Backend response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(path, status = status.as_u16(), "Backend returned error status");
            return Err(BackendError::status(status.as_u16(), &body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn map_send_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_connect() {
            BackendError::Connection {
                url: self.base_url.clone(),
            }
        } else if err.is_timeout() {
            BackendError::Timeout(self.timeout_secs)
        } else {
            BackendError::Http(err.to_string())
        }
    }
}

/// Query pairs for the doctor search endpoint.
pub(crate) fn search_query(specialty: &str, location: Location, radius_km: f64) -> Vec<(&'static str, String)> {
    vec![
        ("specialty", specialty.to_string()),
        ("lat", location.lat.to_string()),
        ("lng", location.lng.to_string()),
        ("radiusKm", radius_km.to_string()),
    ]
}

#[async_trait]
impl BookingBackend for HttpBookingBackend {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn health_check(&self) -> bool {
        let request = self
            .with_key(self.client.get(self.url("/health")))
            .timeout(Duration::from_secs(self.health_timeout_secs));
        match request.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(url = %self.base_url, "Booking backend reachable");
                true
            }
            Ok(response) => {
                tracing::warn!(
                    url = %self.base_url,
                    status = response.status().as_u16(),
                    "Booking backend health check failed"
                );
                false
            }
            Err(e) => {
                tracing::warn!(url = %self.base_url, error = %e, "Booking backend unreachable");
                false
            }
        }
    }

    async fn search_doctors(
        &self,
        specialty: &str,
        location: Location,
        radius_km: f64,
    ) -> Result<Value, BackendError> {
        let request = self
            .client
            .get(self.url("/doctors/search"))
            .query(&search_query(specialty, location, radius_km));
        self.send_json(request, "/doctors/search").await
    }

    async fn check_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<Value, BackendError> {
        let builder = self.client.post(self.url("/availability")).json(request);
        self.send_json(builder, "/availability").await
    }

    async fn schedule_appointment(
        &self,
        request: &AppointmentRequest,
    ) -> Result<Value, BackendError> {
        let builder = self
            .client
            .post(self.url("/appointments/schedule"))
            .json(request);
        self.send_json(builder, "/appointments/schedule").await
    }

    async fn geocode(&self, query: &str) -> Result<Value, BackendError> {
        let request = self.client.get(self.url("/geocode")).query(&[("q", query)]);
        self.send_json(request, "/geocode").await
    }

    async fn parse_message(&self, message: &str) -> Result<NluResult, BackendError> {
        let request = self
            .client
            .post(self.url("/nlu/parse"))
            .json(&json!({ "message": message }));
        let payload = self.send_json(request, "/nlu/parse").await?;
        serde_json::from_value(payload).map_err(|e| BackendError::Decode(e.to_string()))
    }
}
