//! Typed request and response bodies for the catalog endpoint.

use serde::{Deserialize, Serialize};

use super::error::CatalogError;
use super::model::Track;

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub(super) enum Request<'a> {
    List {
        #[serde(skip_serializing_if = "Option::is_none")]
        search: Option<&'a str>,
    },
    Gettext {
        song_id: &'a str,
    },
}

#[derive(Debug, Deserialize)]
pub(super) struct ListResponse {
    pub status: String,
    #[serde(default)]
    pub songs: Vec<Track>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LyricsResponse {
    #[serde(default)]
    pub status: Option<String>,
    pub text: String,
}

/// Normalise a search box value: blank means "no search".
pub fn search_term(query: &str) -> Option<&str> {
    let q = query.trim();
    if q.is_empty() { None } else { Some(q) }
}

pub(super) fn check_status(status: &str) -> Result<(), CatalogError> {
    if status.trim().eq_ignore_ascii_case("error") {
        return Err(CatalogError::Rejected {
            status: status.to_string(),
        });
    }
    Ok(())
}
