//! Package lookup by key.

use crate::client::{AptlyClient, Call};
use crate::config::Resource;
use crate::normalize::ApiResult;
use crate::transport::Transport;

/// Packages: `/api/packages`.
impl<T: Transport> AptlyClient<T> {
    /// Show one package by key, e.g. `Pamd64 hello 1.0 0123abcd`.
    ///
    /// Pass the key as the server returned it; it is percent-encoded here.
    pub fn show_package(&self, key: &str) -> ApiResult {
        self.dispatch(
            Call::get(Resource::Packages)
                .segment(key)
                .context(format!("show package {key}")),
        )
    }
}
