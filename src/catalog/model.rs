use serde::{Deserialize, Deserializer};

use crate::config::CatalogSettings;

/// Server locations: the static file root and the JSON API endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
    api: String,
}

impl Endpoint {
    pub fn new(base_url: &str, api_path: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        let api = format!("{}/{}", base, api_path.trim_start_matches('/'));
        Self { base, api }
    }

    pub fn from_settings(settings: &CatalogSettings) -> Self {
        Self::new(&settings.base_url, &settings.api_path)
    }

    /// Root under which `covers/`, `songs/` and `lyrics/` live.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// URL the JSON requests are posted to.
    pub fn api(&self) -> &str {
        &self.api
    }
}

/// A song as listed by the catalog.
///
/// Immutable once built; every resource location is derived from `id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Track {
    #[serde(deserialize_with = "id_from_string_or_number")]
    id: String,
    name: String,
    artist: String,
}

impl Track {
    pub fn new(id: impl Into<String>, name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artist: artist.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    /// "Artist - Name", or just the name when the artist is blank.
    pub fn display(&self) -> String {
        let artist = self.artist.trim();
        if artist.is_empty() {
            self.name.trim().to_string()
        } else {
            format!("{} - {}", artist, self.name.trim())
        }
    }

    pub fn cover_url(&self, endpoint: &Endpoint) -> String {
        format!("{}/covers/{}/maxresdefault.png", endpoint.base(), self.id)
    }

    pub fn audio_url(&self, endpoint: &Endpoint) -> String {
        format!("{}/songs/{}.wav", endpoint.base(), self.id)
    }

    pub fn lyrics_url(&self, endpoint: &Endpoint) -> String {
        format!("{}/lyrics/{}.txt", endpoint.base(), self.id)
    }
}

// Some servers emit numeric ids.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
