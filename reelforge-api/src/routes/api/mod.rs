/// Resource endpoints under `/api`
///
/// The directory tree mirrors the URL space: each `route.rs` is one endpoint
/// and its directory (relative to this one) is the path, with `[id]` for a
/// dynamic segment. [`catalog`] maps those directories to the handler sets,
/// so pointing `ROUTES_DIR` here yields the same table as the built-in
/// manifest.

#[path = "contact/route.rs"]
pub mod contact;

#[path = "crm/contacts/[id]/route.rs"]
pub mod crm_contact;

#[path = "crm/contacts/route.rs"]
pub mod crm_contacts;

#[path = "videos/route.rs"]
pub mod videos;

use crate::{app::AppState, registry::RouteCatalog};

pub fn catalog() -> RouteCatalog<AppState> {
    RouteCatalog::new()
        .with("contact", contact::module())
        .with("crm/contacts", crm_contacts::module())
        .with("crm/contacts/[id]", crm_contact::module())
        .with("videos", videos::module())
}
