//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the catalog listing,
//! selection, search state and the latest player snapshot.

mod model;

pub use model::*;
