use std::{error::Error as StdError, fmt, time::Duration};

use log::{debug, error, info};
use shared::data::VehicleRecord;

use crate::{
    classify::classify, error::RegistryError, normalize::normalize, registration::QueryRequest,
};

/// The vehicle enquiry endpoint of the registry.
pub const DEFAULT_ENDPOINT: &str =
    "https://driver-vehicle-licensing.api.gov.uk/vehicle-enquiry/v1/vehicles";

/// The registry API key. Kept out of `Debug` output so it never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] if the key is empty or only whitespace.
    pub fn new(key: impl Into<String>) -> Result<Self, RegistryError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(RegistryError::validation("API key must not be empty"));
        }
        Ok(Self(key))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_key: ApiKey,
    /// Whole-request timeout. `None` means no timeout at all.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            timeout: None,
        }
    }
}

/// Status and body of a response, whatever the status was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one enquiry and hands back the response untouched.
///
/// Implementations only fail for transport problems, as
/// [`RegistryError::Transport`]. Unsuccessful statuses are returned as responses.
pub trait Transport {
    /// # Errors
    ///
    /// Returns [`RegistryError::Transport`] if no response could be obtained.
    fn send(
        &mut self,
        endpoint: &str,
        api_key: &ApiKey,
        request: &QueryRequest,
    ) -> Result<RawResponse, RegistryError>;
}

/// [`Transport`] over a blocking reqwest client. The client, and with it the
/// connection pool, lives as long as the transport.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns [`RegistryError::Transport`] if the HTTP client cannot be set up,
    /// for example when no TLS backend is available.
    pub fn new(timeout: Option<Duration>) -> Result<Self, RegistryError> {
        let client = reqwest::blocking::ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|err| transport_error(&err))?;
        Ok(Self { client })
    }

    /// Uses an already configured reqwest client, e.g. one with custom proxy or
    /// TLS settings.
    #[must_use]
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn send(
        &mut self,
        endpoint: &str,
        api_key: &ApiKey,
        request: &QueryRequest,
    ) -> Result<RawResponse, RegistryError> {
        // `json` also sets `Content-Type: application/json`.
        let response = self
            .client
            .post(endpoint)
            .header("x-api-key", api_key.expose())
            .json(request)
            .send()
            .map_err(|err| transport_error(&err))?;

        let status = response.status().as_u16();
        let body = response.bytes().map_err(|err| transport_error(&err))?;

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn transport_error(err: &reqwest::Error) -> RegistryError {
    let message = if err.is_timeout() {
        format!("Request timed out: {}", describe(err))
    } else {
        describe(err)
    };
    RegistryError::Transport { message }
}

/// Renders an error with its whole source chain, skipping sources whose text is
/// already part of the message.
fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

/// Client for the vehicle enquiry registry.
///
/// Queries take `&mut self`, so one client serves one caller at a time. Every
/// query is a single attempt; nothing is retried or cached.
#[derive(Debug)]
pub struct RegistryClient<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
}

impl RegistryClient<HttpTransport> {
    /// # Errors
    ///
    /// Returns [`RegistryError::Transport`] if the HTTP client cannot be set up.
    pub fn new(config: ClientConfig) -> Result<Self, RegistryError> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> RegistryClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Looks up a vehicle by registration number.
    ///
    /// The registration number is normalized before it is sent. Dates in the
    /// response are reformatted by [`normalize`].
    ///
    /// # Errors
    ///
    /// Returns the [`RegistryError`] describing why the lookup failed. Empty input
    /// fails with [`RegistryError::Validation`] without touching the network.
    pub fn query(&mut self, registration: &str) -> Result<VehicleRecord, RegistryError> {
        let result = self.query_inner(registration);
        if let Err(err) = &result {
            error!("Enquiry for {registration:?} failed: {err}");
        }
        result
    }

    fn query_inner(&mut self, registration: &str) -> Result<VehicleRecord, RegistryError> {
        let request = QueryRequest::new(registration)?;
        info!(
            "Querying registry for vehicle: {}",
            request.registration_number()
        );
        debug!("Sending enquiry to {}", self.config.endpoint);

        let response = self
            .transport
            .send(&self.config.endpoint, &self.config.api_key, &request)?;
        debug!(
            "Got response: status {}, {} bytes",
            response.status,
            response.body.len()
        );

        if !response.is_success() {
            return Err(classify(response.status, &response.body));
        }

        let record: VehicleRecord =
            serde_json::from_slice(&response.body).map_err(|err| RegistryError::Parsing {
                message: err.to_string(),
            })?;
        Ok(normalize(record))
    }
}
