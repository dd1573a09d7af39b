//! Handlers selected by the router.

pub mod asset;
pub mod root;
