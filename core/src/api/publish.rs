//! Published repositories under `/api/publish`.
//!
//! # Design
//! The publishing prefix is a single path segment. It is escaped with
//! `sanitize_prefix` first, so `ppa/main` becomes `ppa_main` and the root
//! prefix `.` becomes `:.`. An unset or empty prefix adds no segment.

use crate::client::{AptlyClient, Call};
use crate::config::Resource;
use crate::normalize::ApiResult;
use crate::prefix::sanitize_prefix;
use crate::transport::Transport;
use crate::types::{DeletePublish, Publish, UpdatePublish};

/// Published repositories: `/api/publish`.
impl<T: Transport> AptlyClient<T> {
    /// List published repositories.
    pub fn list_published(&self) -> ApiResult {
        self.dispatch(Call::get(Resource::Publish).context("list published repos"))
    }

    /// Publish a local repository or snapshots under `publish.prefix`.
    ///
    /// The prefix may name a storage, e.g. `s3:packages/ppa`.
    pub fn publish(&self, publish: &Publish) -> ApiResult {
        let call = with_prefix(Call::post(Resource::Publish), publish.prefix.as_deref());
        self.dispatch(call.json(publish)?.context("publish"))
    }

    /// Re-publish `distribution`: a published local repository is synced to
    /// the repository's contents, a snapshot publish switches components to
    /// `update.snapshots`.
    pub fn update_publish(&self, distribution: &str, update: &UpdatePublish) -> ApiResult {
        let call = with_prefix(Call::put(Resource::Publish), update.prefix.as_deref())
            .segment(distribution);
        self.dispatch(
            call.json(update)?
                .context(format!("update published {distribution}")),
        )
    }

    /// Drop a published repository and clean up its files.
    pub fn delete_publish(&self, distribution: &str, options: &DeletePublish) -> ApiResult {
        let call = with_prefix(Call::delete(Resource::Publish), options.prefix.as_deref())
            .segment(distribution)
            .query(options);
        self.dispatch(call.context(format!("delete published {distribution}")))
    }
}

/// Add the escaped prefix as a segment; no segment at all when unset or empty.
fn with_prefix(call: Call, prefix: Option<&str>) -> Call {
    match prefix {
        Some(prefix) if !prefix.is_empty() => call.segment(sanitize_prefix(prefix)),
        _ => call,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{body_json, client, HOST};
    use crate::http::HttpMethod;
    use crate::types::*;
    use serde_json::json;

    fn local_publish(prefix: Option<&str>) -> Publish {
        Publish {
            prefix: prefix.map(str::to_string),
            source_kind: SourceKind::Local,
            sources: vec![PublishSource::new("repo1")],
            distribution: Some("bookworm".to_string()),
            ..Publish::default()
        }
    }

    #[test]
    fn publish_without_prefix_omits_the_segment() {
        let c = client();
        c.publish(&local_publish(None)).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, format!("{HOST}/api/publish"));
        assert_eq!(
            body_json(&c),
            Some(json!({
                "SourceKind": "local",
                "Sources": [{"Name": "repo1"}],
                "Distribution": "bookworm"
            }))
        );
    }

    #[test]
    fn empty_prefix_counts_as_none() {
        let c = client();
        c.publish(&local_publish(Some(""))).unwrap();
        assert_eq!(c.transport().last_request().url, format!("{HOST}/api/publish"));
    }

    #[test]
    fn publish_prefix_is_sanitized() {
        let c = client();
        c.publish(&local_publish(Some("ppa/main_x"))).unwrap();
        assert_eq!(
            c.transport().last_request().url,
            format!("{HOST}/api/publish/ppa_main__x")
        );
    }

    #[test]
    fn root_prefix_becomes_colon_dot() {
        let c = client();
        let update = UpdatePublish {
            prefix: Some(".".to_string()),
            force_overwrite: true,
            ..UpdatePublish::default()
        };
        c.update_publish("bookworm", &update).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, format!("{HOST}/api/publish/:./bookworm"));
        assert_eq!(body_json(&c), Some(json!({"ForceOverwrite": true})));
    }

    #[test]
    fn update_without_prefix_or_options() {
        let c = client();
        c.update_publish("bookworm", &UpdatePublish::default()).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.url, format!("{HOST}/api/publish/bookworm"));
        assert!(req.body.is_none());
    }

    #[test]
    fn delete_publish_with_force() {
        let c = client();
        let options = DeletePublish {
            prefix: Some("s3:repo/debian".to_string()),
            force: true,
        };
        c.delete_publish("bookworm", &options).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, format!("{HOST}/api/publish/s3:repo_debian/bookworm?force=1"));
        assert!(req.body.is_none());
    }

    #[test]
    fn dot_dot_prefix_stays_a_segment() {
        let c = client();
        let options = DeletePublish {
            prefix: Some("..".to_string()),
            force: false,
        };
        c.delete_publish("bookworm", &options).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, format!("{HOST}/api/publish/%2E%2E/bookworm"));
        assert_ne!(req.url, format!("{HOST}/api/publish/bookworm"));
    }
}
