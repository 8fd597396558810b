//! HTTP backend for the admin REST API.
//!
//! Every request is blocking and carries Basic auth when the connection
//! config has complete credentials. Non-2xx responses are turned into
//! [`Error::RequestFailed`] with the response body attached; the agent is
//! configured not to treat status codes as transport errors so the body
//! stays readable.

use crate::backend::Backend;
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::types::{BUCKETS_PATH, BucketSettings, bucket_path, parse_listing};
use ureq::http::Response;

/// Admin REST backend over HTTP.
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// `http://host:port`.
    base_url: String,
    /// Precomputed `Authorization` header value.
    authorization: Option<String>,
}

impl HttpBackend {
    /// Create a backend for the given connection.
    #[must_use]
    pub fn new(config: &ConnectionConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            base_url: config.base_url(),
            authorization: config.authorization_header(),
        }
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests carry Basic auth.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authorization.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        match &self.authorization {
            Some(value) => request.header("Authorization", value.as_str()),
            None => request,
        }
    }

    fn post_form(&self, path: &str, settings: &BucketSettings) -> Result<()> {
        let form = settings.to_form();
        let request = self.authorize(self.agent.post(&self.url(path)));
        let result = request.send_form(form.iter().map(|(k, v)| (*k, v.as_str())));
        finish("POST", path, result).map(|_| ())
    }
}

/// Turn a ureq result into the response body, or a `RequestFailed`.
fn finish(
    method: &'static str,
    path: &str,
    result: std::result::Result<Response<ureq::Body>, ureq::Error>,
) -> Result<String> {
    let mut response = match result {
        Ok(response) => response,
        Err(e) => {
            log::debug!("{method} {path} -> transport error: {e}");
            return Err(Error::request_failed(method, path, None, e.to_string()));
        }
    };

    let status = response.status();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| Error::request_failed(method, path, Some(status.as_u16()), e.to_string()))?;
    log::debug!("{method} {path} -> {}", status.as_u16());

    if status.is_success() {
        Ok(body)
    } else {
        Err(Error::request_failed(method, path, Some(status.as_u16()), body))
    }
}

impl Backend for HttpBackend {
    fn list_buckets(&self) -> Result<Vec<BucketSettings>> {
        let request = self.authorize(self.agent.get(&self.url(BUCKETS_PATH)));
        let body = finish("GET", BUCKETS_PATH, request.call())?;
        parse_listing(&body)
    }

    fn create_bucket(&self, settings: &BucketSettings) -> Result<()> {
        self.post_form(BUCKETS_PATH, settings)
    }

    fn update_bucket(&self, settings: &BucketSettings) -> Result<()> {
        self.post_form(&bucket_path(&settings.name), settings)
    }

    fn delete_bucket(&self, name: &str) -> Result<()> {
        let path = bucket_path(name);
        let request = self.authorize(self.agent.delete(&self.url(&path)));
        finish("DELETE", &path, request.call()).map(|_| ())
    }
}
