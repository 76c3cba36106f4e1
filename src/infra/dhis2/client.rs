//! Reqwest-backed DHIS2 Web API client.
//!
//! Owns transport details only: URL layout, authentication, timeouts, status
//! mapping and JSON decoding.

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::dto::WebMessageDto;
use crate::infra::config::settings::{Credentials, Settings};

const USER_AGENT: &str = concat!("ou-linker/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum Dhis2Error {
    #[error("request to DHIS2 failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("DHIS2 responded with {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("unexpected DHIS2 payload: {0}")]
    Decode(String),
    #[error("invalid DHIS2 URL: {0}")]
    InvalidUrl(String),
}

pub struct Dhis2Client {
    http: Client,
    api_root: Url,
    credentials: Credentials,
}

impl Dhis2Client {
    /// # Errors
    ///
    /// Returns an error when the base URL is not an absolute http(s) URL or
    /// the reqwest client cannot be constructed.
    pub fn new(settings: &Settings) -> Result<Self, Dhis2Error> {
        let api_root = build_api_root(&settings.server.base_url, &settings.server.api_version)?;
        let http = Client::builder()
            .timeout(settings.timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            api_root,
            credentials: settings.credentials(),
        })
    }

    pub fn endpoint(&self, resource: &str) -> Result<Url, Dhis2Error> {
        self.api_root
            .join(resource.trim_start_matches('/'))
            .map_err(|err| Dhis2Error::InvalidUrl(format!("{resource}: {err}")))
    }

    pub async fn get_json<T>(&self, resource: &str, query: &[(&str, &str)]) -> Result<T, Dhis2Error>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(resource)?;
        debug!(%url, "GET");
        let request = self.http.get(url).query(query);
        let body = self.send(request).await?;
        serde_json::from_slice(&body)
            .map_err(|err| Dhis2Error::Decode(format!("{resource}: {err}")))
    }

    pub async fn post_json<B>(&self, resource: &str, body: &B) -> Result<(), Dhis2Error>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(resource)?;
        debug!(%url, "POST");
        let request = self.http.post(url).json(body);
        self.send(request).await?;
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, Dhis2Error> {
        let request = match &self.credentials {
            Credentials::Anonymous => request,
            Credentials::Basic { username, password } => request.basic_auth(username, Some(password)),
            Credentials::Token(token) => request.header(AUTHORIZATION, format!("ApiToken {token}")),
        };
        let response = request.header(ACCEPT, "application/json").send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        Ok(body.to_vec())
    }
}

/// Builds `{base}/api/` or `{base}/api/{version}/`, keeping any context path.
pub fn build_api_root(base_url: &str, api_version: &str) -> Result<Url, Dhis2Error> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|err| Dhis2Error::InvalidUrl(format!("{base_url}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Dhis2Error::InvalidUrl(format!(
            "{base_url}: scheme must be http or https"
        )));
    }

    let mut path = url.path().trim_end_matches('/').to_string();
    path.push_str("/api/");
    let version = api_version.trim().trim_matches('/');
    if !version.is_empty() {
        path.push_str(version);
        path.push('/');
    }
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn map_status_error(status: StatusCode, body: &[u8]) -> Dhis2Error {
    let message = serde_json::from_slice::<WebMessageDto>(body)
        .ok()
        .and_then(|web_message| web_message.message)
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty() && text.len() <= 200).then_some(text)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
    Dhis2Error::Status { status, message }
}
