//! One method per Aptly endpoint, grouped by resource family.
//!
//! Each method only states its verb, path and parameter placement, then
//! hands a `Call` to `AptlyClient::dispatch`.

mod files;
mod misc;
mod packages;
mod publish;
mod repos;
mod snapshots;
