//! URL handling module for Slutpris
//!
//! This module knows the supported cities, builds the per-page index URLs
//! (optionally filtered by sold date) and canonicalizes listing links.

mod canonical;
mod city;
mod template;

pub use canonical::canonical_listing_url;
pub use city::City;
pub use template::{PageUrl, SoldListingsUrl};
