//! Upload directories under `/api/files`.
//!
//! Uploads are encoded as one `multipart/form-data` request with a `file`
//! field per local file, in the order given.

use std::path::Path;

use log::debug;

use crate::client::{AptlyClient, Call};
use crate::config::Resource;
use crate::error::{AptlyError, Result};
use crate::http::{FilePart, Multipart};
use crate::normalize::ApiResult;
use crate::transport::Transport;

/// Form field aptly reads uploaded files from.
const UPLOAD_FIELD: &str = "file";

/// Upload directories: `/api/files`.
impl<T: Transport> AptlyClient<T> {
    /// List upload directories.
    pub fn list_dirs(&self) -> ApiResult {
        self.dispatch(Call::get(Resource::Files).context("list upload dirs"))
    }

    /// List the files in upload directory `dir`.
    pub fn list_files(&self, dir: &str) -> ApiResult {
        self.dispatch(
            Call::get(Resource::Files)
                .segment(dir)
                .context(format!("list files in {dir}")),
        )
    }

    /// Upload one local file into `dir`, creating the directory if needed.
    pub fn upload_file(&self, dir: &str, file: impl AsRef<Path>) -> ApiResult {
        self.upload_files(dir, [file])
    }

    /// Upload several local files into `dir` as one multipart request.
    ///
    /// Files are sent in iteration order and keep their base names; existing
    /// files of the same name are overwritten by the server.
    pub fn upload_files<I, P>(&self, dir: &str, files: I) -> ApiResult
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut form = Multipart::new();
        for file in files {
            form.push(read_part(file.as_ref())?);
        }
        debug!("uploading {} file(s) to {dir}", form.parts().len());
        self.dispatch(
            Call::post(Resource::Files)
                .segment(dir)
                .multipart(form)
                .context(format!("upload to {dir}")),
        )
    }

    /// Delete upload directory `dir` with everything in it.
    pub fn delete_dir(&self, dir: &str) -> ApiResult {
        self.dispatch(
            Call::delete(Resource::Files)
                .segment(dir)
                .context(format!("delete upload dir {dir}")),
        )
    }

    /// Delete a single uploaded file.
    pub fn delete_file(&self, dir: &str, file: &str) -> ApiResult {
        self.dispatch(
            Call::delete(Resource::Files)
                .segment(dir)
                .segment(file)
                .context(format!("delete {dir}/{file}")),
        )
    }
}

fn read_part(path: &Path) -> Result<FilePart> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            AptlyError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            ))
        })?;
    Ok(FilePart {
        field: UPLOAD_FIELD.to_string(),
        file_name,
        content: std::fs::read(path)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{client, HOST};
    use crate::error::AptlyError;
    use crate::http::{HttpMethod, RequestBody};
    use std::fs;

    #[test]
    fn multiple_files_go_in_one_request_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let second = dir.path().join("b_2.0_amd64.deb");
        let first = dir.path().join("a_1.0_amd64.deb");
        fs::write(&second, b"bbb").unwrap();
        fs::write(&first, b"aa").unwrap();

        let c = client();
        c.upload_files("incoming", [&second, &first]).unwrap();

        let requests = c.transport().requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, format!("{HOST}/api/files/incoming"));
        assert!(req
            .header("Content-Type")
            .unwrap()
            .starts_with("multipart/form-data; boundary="));
        let Some(RequestBody::Multipart(form)) = &req.body else {
            panic!("expected multipart body, got {:?}", req.body);
        };
        let names: Vec<_> = form.parts().iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, ["b_2.0_amd64.deb", "a_1.0_amd64.deb"]);
        assert_eq!(form.parts()[0].content, b"bbb");
        assert!(form.parts().iter().all(|p| p.field == "file"));
    }

    #[test]
    fn single_file_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello_1.0_amd64.deb");
        fs::write(&path, b"deb").unwrap();

        let c = client();
        c.upload_file("incoming", &path).unwrap();
        let Some(RequestBody::Multipart(form)) = c.transport().last_request().body else {
            panic!("expected multipart body");
        };
        assert_eq!(form.parts().len(), 1);
    }

    #[test]
    fn missing_file_fails_before_any_request() {
        let c = client();
        let err = c.upload_file("incoming", "/nonexistent/pkg.deb").unwrap_err();
        assert!(matches!(err, AptlyError::Io(_)));
        assert!(c.transport().requests().is_empty());
    }

    #[test]
    fn delete_file_path() {
        let c = client();
        c.delete_file("incoming", "hello_1.0_amd64.deb").unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, format!("{HOST}/api/files/incoming/hello_1.0_amd64.deb"));
    }

    #[test]
    fn listing_paths() {
        let c = client();
        c.list_dirs().unwrap();
        c.list_files("incoming").unwrap();
        c.delete_dir("incoming").unwrap();
        let urls: Vec<_> = c.transport().requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            [
                format!("{HOST}/api/files"),
                format!("{HOST}/api/files/incoming"),
                format!("{HOST}/api/files/incoming"),
            ]
        );
    }
}
