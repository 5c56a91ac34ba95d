//! Remote song catalog: track descriptors, the wire protocol and the HTTP client.
//!
//! The server exposes one JSON endpoint that dispatches on an `action` field,
//! plus static covers and audio files derived from each track id.

mod client;
mod error;
mod model;
mod protocol;

pub use client::{Catalog, HttpCatalog};
pub use error::CatalogError;
pub use model::{Endpoint, Track};
pub use protocol::search_term;
