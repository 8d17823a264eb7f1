mod common;

use std::sync::Mutex;

use assert_matches::assert_matches;
use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use reqwest::blocking::Response;

use common::TestServer;
use sracp::error::SracpError;
use sracp::storage::{
    ByteRange, CredentialSource, HttpObjectReader, ObjectReader, S3Location, S3ObjectFetcher,
};

const OBJECT: &[u8] = b"Hello, World!";

async fn object(headers: HeaderMap) -> impl IntoResponse {
    let Some(range) = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("bytes="))
    else {
        return (StatusCode::OK, OBJECT.to_vec());
    };
    let (start, end) = range.split_once('-').unwrap();
    let start: usize = start.parse().unwrap();
    let end: usize = if end.is_empty() {
        OBJECT.len() - 1
    } else {
        end.parse().unwrap()
    };
    (StatusCode::PARTIAL_CONTENT, OBJECT[start..=end].to_vec())
}

#[derive(Default)]
struct MockS3 {
    calls: Mutex<Vec<S3Location>>,
    denied: bool,
}

impl S3ObjectFetcher for MockS3 {
    fn get_object(&self, location: &S3Location) -> Result<Vec<u8>, SracpError> {
        self.calls.lock().unwrap().push(location.clone());
        if self.denied {
            return Err(SracpError::Unauthorized(location.url.clone()));
        }
        Ok(b"ngc-from-s3".to_vec())
    }
}

#[derive(Default)]
struct MockReader {
    urls: Mutex<Vec<String>>,
}

impl ObjectReader for MockReader {
    fn head(&self, url: &str) -> Result<Response, SracpError> {
        Err(SracpError::StorageHttp(format!("unexpected HEAD {url}")))
    }

    fn get_range(&self, url: &str, _range: Option<ByteRange>) -> Result<Response, SracpError> {
        Err(SracpError::StorageHttp(format!("unexpected GET {url}")))
    }

    fn read_bytes(&self, url: &str) -> Result<Vec<u8>, SracpError> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(b"ngc-presigned".to_vec())
    }
}

fn router() -> Router {
    Router::new()
        .route("/object", get(object))
        .route("/forbidden", get(|| async { StatusCode::FORBIDDEN }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/method", get(|| async { StatusCode::METHOD_NOT_ALLOWED }))
        .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
}

#[test]
fn range_read_returns_slice() {
    let server = TestServer::start(router());
    let reader = HttpObjectReader::new().unwrap();

    let response = reader
        .get_range(&server.url("/object"), Some(ByteRange::new(0, Some(4))))
        .unwrap();
    assert_eq!(response.status().as_u16(), 206);
    assert_eq!(response.bytes().unwrap().as_ref(), b"Hello");

    let response = reader
        .get_range(&server.url("/object"), Some(ByteRange::new(7, None)))
        .unwrap();
    assert_eq!(response.bytes().unwrap().as_ref(), b"World!");
}

#[test]
fn read_bytes_returns_whole_object() {
    let server = TestServer::start(router());
    let reader = HttpObjectReader::new().unwrap();
    assert_eq!(reader.read_bytes(&server.url("/object")).unwrap(), OBJECT);
}

#[test]
fn head_reports_status() {
    let server = TestServer::start(router());
    let reader = HttpObjectReader::new().unwrap();
    let response = reader.head(&server.url("/object")).unwrap();
    assert!(response.status().is_success());
}

#[test]
fn failing_statuses_map_to_error_classes() {
    let server = TestServer::start(router());
    let reader = HttpObjectReader::new().unwrap();

    assert_matches!(
        reader.get(&server.url("/forbidden")).unwrap_err(),
        SracpError::Unauthorized(_)
    );
    assert_matches!(
        reader.get(&server.url("/missing")).unwrap_err(),
        SracpError::NotFound(_)
    );
    assert_matches!(
        reader.get(&server.url("/method")).unwrap_err(),
        SracpError::MethodNotSupported(_)
    );
    assert_matches!(
        reader.get(&server.url("/broken")).unwrap_err(),
        SracpError::ServerError { status: 500, .. }
    );
    assert_matches!(
        reader.get(&server.url("/teapot")).unwrap_err(),
        SracpError::StorageStatus { status: 418, .. }
    );
}

#[test]
fn credential_from_local_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("prj_1.ngc");
    std::fs::write(&path, b"ngc-bytes").unwrap();
    let reader = HttpObjectReader::new().unwrap();
    let s3 = MockS3::default();

    let source = CredentialSource::parse(path.to_str().unwrap()).unwrap();
    assert_eq!(source.read(&reader, &s3).unwrap(), b"ngc-bytes");
    assert!(s3.calls.lock().unwrap().is_empty());
}

#[test]
fn missing_credential_file_is_an_error() {
    let reader = HttpObjectReader::new().unwrap();
    let source = CredentialSource::parse("/definitely/not/here.ngc").unwrap();
    assert_matches!(
        source.read(&reader, &MockS3::default()).unwrap_err(),
        SracpError::CredentialRead { .. }
    );
}

#[test]
fn s3_credential_is_fetched_by_bucket_and_key() {
    let reader = MockReader::default();
    let s3 = MockS3::default();
    let source =
        CredentialSource::parse("https://dbgap-keys.us-west-2.s3.amazonaws.com/projects/prj_1.ngc")
            .unwrap();

    assert_eq!(source.read(&reader, &s3).unwrap(), b"ngc-from-s3");

    let calls = s3.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].bucket, "dbgap-keys");
    assert_eq!(calls[0].region, "us-west-2");
    assert_eq!(calls[0].key, "projects/prj_1.ngc");
    assert!(reader.urls.lock().unwrap().is_empty());
}

#[test]
fn denied_s3_credential_surfaces_the_error() {
    let s3 = MockS3 {
        denied: true,
        ..MockS3::default()
    };
    let source =
        CredentialSource::parse("https://dbgap-keys.us-west-2.s3.amazonaws.com/prj_1.ngc").unwrap();
    assert_matches!(
        source.read(&MockReader::default(), &s3).unwrap_err(),
        SracpError::Unauthorized(_)
    );
}

#[test]
fn presigned_credential_url_uses_plain_get() {
    let reader = MockReader::default();
    let s3 = MockS3::default();
    let url = "https://dbgap-keys.us-west-2.s3.amazonaws.com/prj_1.ngc?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Signature=deadbeef";
    let source = CredentialSource::parse(url).unwrap();

    assert_eq!(source.read(&reader, &s3).unwrap(), b"ngc-presigned");
    assert_eq!(reader.urls.lock().unwrap().as_slice(), [url.to_string()]);
    assert!(s3.calls.lock().unwrap().is_empty());
}
