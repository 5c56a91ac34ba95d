use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

use crate::config::CatalogSettings;

use super::error::CatalogError;
use super::model::{Endpoint, Track};
use super::protocol::{ListResponse, LyricsResponse, Request, check_status};

/// Read access to the remote catalog.
///
/// Calls block; the runtime only invokes them from worker threads.
pub trait Catalog: Send + Sync {
    /// List songs, optionally filtered by a search term.
    fn list(&self, search: Option<&str>) -> Result<Vec<Track>, CatalogError>;

    /// Raw lyric text for a song. The server's "no lyrics" placeholder is
    /// passed through untouched.
    fn lyrics(&self, song_id: &str) -> Result<String, CatalogError>;
}

pub struct HttpCatalog {
    http: Client,
    endpoint: Endpoint,
}

impl HttpCatalog {
    pub fn new(settings: &CatalogSettings) -> Result<Self, CatalogError> {
        let http = Client::builder()
            .user_agent(concat!("cadenza/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout_secs.map(Duration::from_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: Endpoint::from_settings(settings),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The underlying HTTP client, shared with the audio downloader.
    pub fn http_client(&self) -> Client {
        self.http.clone()
    }

    fn post<R: DeserializeOwned>(&self, request: &Request<'_>) -> Result<R, CatalogError> {
        log::debug!("POST {} {:?}", self.endpoint.api(), request);
        let body = self
            .http
            .post(self.endpoint.api())
            .json(request)
            .send()?
            .error_for_status()?
            .text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl Catalog for HttpCatalog {
    fn list(&self, search: Option<&str>) -> Result<Vec<Track>, CatalogError> {
        let response: ListResponse = self.post(&Request::List { search })?;
        check_status(&response.status)?;
        log::info!(
            "catalog returned {} songs (search: {:?})",
            response.songs.len(),
            search
        );
        Ok(response.songs)
    }

    fn lyrics(&self, song_id: &str) -> Result<String, CatalogError> {
        let response: LyricsResponse = self.post(&Request::Gettext { song_id })?;
        if let Some(status) = &response.status {
            check_status(status)?;
        }
        Ok(response.text)
    }
}
