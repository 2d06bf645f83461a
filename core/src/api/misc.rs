//! Server-wide endpoints: version and the object graph.

use std::path::PathBuf;

use log::info;

use crate::client::{AptlyClient, Call};
use crate::config::Resource;
use crate::error::Result;
use crate::normalize::ApiResult;
use crate::transport::Transport;
use crate::types::GraphRequest;

/// Server-wide endpoints under `/api`.
impl<T: Transport> AptlyClient<T> {
    /// Version of the aptly server, e.g. `{"Version": "1.5.0"}`.
    pub fn version(&self) -> ApiResult {
        self.dispatch(
            Call::get(Resource::Root)
                .segment("version")
                .context("aptly version"),
        )
    }

    /// Render the graph of aptly objects (as `aptly graph` does) and save it.
    ///
    /// The image is streamed to the destination as-is and the written path
    /// is returned. Nothing is written unless the server answers 2xx.
    pub fn graph(&self, request: &GraphRequest) -> Result<PathBuf> {
        let call = Call::get(Resource::Root)
            .segment(format!("graph.{}", request.format.extension()));
        let path = request.destination();
        let bytes = self.download(&call, &path)?;
        info!("wrote {bytes} byte graph to {}", path.display());
        Ok(path)
    }
}
