//! Local repositories under `/api/repos`, including imports from upload
//! directories and snapshots taken from a repository.

use crate::client::{AptlyClient, Call};
use crate::config::Resource;
use crate::normalize::ApiResult;
use crate::transport::Transport;
use crate::types::{
    AddUploaded, CreateRepo, CreateSnapshot, DeleteRepo, EditRepo, PackageQuery, PackageRefs,
};

/// Local repositories: `/api/repos`.
impl<T: Transport> AptlyClient<T> {
    /// List every local repository.
    pub fn list_local_repos(&self) -> ApiResult {
        self.dispatch(Call::get(Resource::Repos).context("list local repos"))
    }

    /// Create an empty local repository.
    pub fn create_local_repo(&self, repo: &CreateRepo) -> ApiResult {
        self.dispatch(
            Call::post(Resource::Repos)
                .json(repo)?
                .context(format!("create local repo {}", repo.name)),
        )
    }

    pub fn show_local_repo(&self, name: &str) -> ApiResult {
        self.dispatch(
            Call::get(Resource::Repos)
                .segment(name)
                .context(format!("show local repo {name}")),
        )
    }

    /// List or search the packages of a local repository.
    pub fn show_repo_packages(&self, name: &str, query: &PackageQuery) -> ApiResult {
        self.dispatch(
            Call::get(Resource::Repos)
                .segment(name)
                .segment("packages")
                .query(query)
                .context(format!("list packages of {name}")),
        )
    }

    /// Update repository metadata. Unset fields are left unchanged.
    pub fn edit_local_repo(&self, name: &str, changes: &EditRepo) -> ApiResult {
        self.dispatch(
            Call::put(Resource::Repos)
                .segment(name)
                .json(changes)?
                .context(format!("edit local repo {name}")),
        )
    }

    /// Delete a local repository. A published repository cannot be deleted;
    /// one with snapshots needs `force`.
    pub fn delete_local_repo(&self, name: &str, options: &DeleteRepo) -> ApiResult {
        self.dispatch(
            Call::delete(Resource::Repos)
                .segment(name)
                .query(options)
                .context(format!("delete local repo {name}")),
        )
    }

    /// Import packages from the upload directory `dir`, or from a single
    /// file in it when `options.file` is set.
    pub fn add_uploaded_packages(&self, name: &str, dir: &str, options: &AddUploaded) -> ApiResult {
        let mut call = Call::post(Resource::Repos)
            .segment(name)
            .segment("file")
            .segment(dir);
        if let Some(file) = &options.file {
            call = call.segment(file.as_str());
        }
        self.dispatch(
            call.query(options)
                .context(format!("import {dir} into {name}")),
        )
    }

    /// Add packages already known to aptly, by key.
    pub fn add_packages_by_key(&self, name: &str, refs: &PackageRefs) -> ApiResult {
        self.dispatch(
            Call::post(Resource::Repos)
                .segment(name)
                .segment("packages")
                .json(refs)?
                .context(format!("add packages to {name}")),
        )
    }

    /// Remove packages from a local repository, by key.
    pub fn delete_packages_by_key(&self, name: &str, refs: &PackageRefs) -> ApiResult {
        self.dispatch(
            Call::delete(Resource::Repos)
                .segment(name)
                .segment("packages")
                .json(refs)?
                .context(format!("remove packages from {name}")),
        )
    }

    /// Snapshot the current contents of a local repository.
    pub fn create_snapshot_from_repo(&self, name: &str, snapshot: &CreateSnapshot) -> ApiResult {
        self.dispatch(
            Call::post(Resource::Repos)
                .segment(name)
                .segment("snapshots")
                .json(snapshot)?
                .context(format!("snapshot {name}")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{body_json, client, HOST};
    use crate::http::HttpMethod;
    use crate::types::*;
    use serde_json::json;

    #[test]
    fn create_sends_only_the_name() {
        let c = client();
        c.create_local_repo(&CreateRepo::named("repo1")).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, format!("{HOST}/api/repos"));
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(body_json(&c), Some(json!({"Name": "repo1"})));
        assert_eq!(c.transport().requests().len(), 1);
    }

    #[test]
    fn create_with_all_fields() {
        let c = client();
        let repo = CreateRepo {
            name: "repo1".to_string(),
            comment: Some("test repo".to_string()),
            default_distribution: Some("bookworm".to_string()),
            default_component: Some("main".to_string()),
            from_snapshot: None,
        };
        c.create_local_repo(&repo).unwrap();
        assert_eq!(
            body_json(&c),
            Some(json!({
                "Name": "repo1",
                "Comment": "test repo",
                "DefaultDistribution": "bookworm",
                "DefaultComponent": "main"
            }))
        );
    }

    #[test]
    fn delete_without_options_has_empty_query() {
        let c = client();
        c.delete_local_repo("repo1", &DeleteRepo::default()).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, format!("{HOST}/api/repos/repo1"));
        assert!(req.body.is_none());
    }

    #[test]
    fn delete_with_force() {
        let c = client();
        c.delete_local_repo("repo1", &DeleteRepo { force: true }).unwrap();
        assert_eq!(c.transport().last_request().url, format!("{HOST}/api/repos/repo1?force=1"));
    }

    #[test]
    fn edit_with_no_changes_sends_no_body() {
        let c = client();
        c.edit_local_repo("repo1", &EditRepo::default()).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Put);
        assert!(req.body.is_none());
        assert!(req.header("Content-Type").is_none());
    }

    #[test]
    fn add_uploaded_single_file_goes_in_path() {
        let c = client();
        let options = AddUploaded {
            file: Some("hello_1.0_amd64.deb".to_string()),
            no_remove: true,
            ..AddUploaded::default()
        };
        c.add_uploaded_packages("repo1", "incoming", &options).unwrap();
        assert_eq!(
            c.transport().last_request().url,
            format!("{HOST}/api/repos/repo1/file/incoming/hello_1.0_amd64.deb?noRemove=1")
        );
    }

    #[test]
    fn add_uploaded_whole_directory() {
        let c = client();
        c.add_uploaded_packages("repo1", "incoming", &AddUploaded::default()).unwrap();
        assert_eq!(
            c.transport().last_request().url,
            format!("{HOST}/api/repos/repo1/file/incoming")
        );
    }

    #[test]
    fn delete_by_key_carries_body_on_delete() {
        let c = client();
        let refs = PackageRefs::new(["Pamd64 hello 1.0 abc"]);
        c.delete_packages_by_key("repo1", &refs).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, format!("{HOST}/api/repos/repo1/packages"));
        assert_eq!(body_json(&c), Some(json!({"PackageRefs": ["Pamd64 hello 1.0 abc"]})));
    }

    #[test]
    fn package_search_query() {
        let c = client();
        let query = PackageQuery {
            q: Some("hello".to_string()),
            format: Some(PackageFormat::Details),
            ..PackageQuery::default()
        };
        c.show_repo_packages("repo1", &query).unwrap();
        assert_eq!(
            c.transport().last_request().url,
            format!("{HOST}/api/repos/repo1/packages?q=hello&format=details")
        );
    }

    #[test]
    fn snapshot_from_repo() {
        let c = client();
        c.create_snapshot_from_repo("repo1", &CreateSnapshot::named("snap1")).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.url, format!("{HOST}/api/repos/repo1/snapshots"));
        assert_eq!(body_json(&c), Some(json!({"Name": "snap1"})));
    }

    #[test]
    fn dot_names_do_not_escape_the_collection() {
        let c = client();
        c.delete_local_repo("..", &DeleteRepo::default()).unwrap();
        assert_eq!(c.transport().last_request().url, format!("{HOST}/api/repos/%2E%2E"));

        c.show_local_repo(".").unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, format!("{HOST}/api/repos/%2E"));
    }
}
