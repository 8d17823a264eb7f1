use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, RANGE, USER_AGENT};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::error::SracpError;

static S3_VIRTUAL_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?P<host>[^/:]+)(?::\d+)?(?P<key>/[^?#]*)?").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    pub fn new(start: u64, end: Option<u64>) -> Self {
        Self { start, end }
    }

    pub fn header_value(&self) -> String {
        match self.end {
            Some(end) => format!("bytes={}-{}", self.start, end),
            None => format!("bytes={}-", self.start),
        }
    }
}

pub trait ObjectReader: Send + Sync {
    fn head(&self, url: &str) -> Result<Response, SracpError>;
    fn get_range(&self, url: &str, range: Option<ByteRange>) -> Result<Response, SracpError>;

    fn get(&self, url: &str) -> Result<Response, SracpError> {
        self.get_range(url, None)
    }

    fn read_bytes(&self, url: &str) -> Result<Vec<u8>, SracpError> {
        let response = self.get(url)?;
        let bytes = response
            .bytes()
            .map_err(|err| SracpError::StorageHttp(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Clone)]
pub struct HttpObjectReader {
    client: Client,
}

impl HttpObjectReader {
    pub fn new() -> Result<Self, SracpError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("sracp/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SracpError::StorageHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| SracpError::StorageHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ObjectReader for HttpObjectReader {
    fn head(&self, url: &str) -> Result<Response, SracpError> {
        self.client
            .head(url)
            .send()
            .map_err(|err| SracpError::StorageHttp(err.to_string()))
    }

    fn get_range(&self, url: &str, range: Option<ByteRange>) -> Result<Response, SracpError> {
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(RANGE, range.header_value());
        }
        let response = request
            .send()
            .map_err(|err| SracpError::StorageHttp(err.to_string()))?;
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            debug!("status code: {}", status.as_u16());
            return Err(status_error(status.as_u16(), url));
        }
        Ok(response)
    }
}

pub fn status_error(status: u16, url: &str) -> SracpError {
    match status {
        401 | 403 => SracpError::Unauthorized(url.to_string()),
        404 => SracpError::NotFound(url.to_string()),
        405 => SracpError::MethodNotSupported(url.to_string()),
        code @ 500..=599 => SracpError::ServerError {
            status: code,
            url: url.to_string(),
        },
        code => SracpError::StorageStatus {
            status: code,
            url: url.to_string(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub url: String,
    pub bucket: String,
    pub region: String,
    pub key: String,
}

impl S3Location {
    pub fn parse(url: &str) -> Result<Self, SracpError> {
        let invalid = || SracpError::InvalidCredentialUrl(url.to_string());
        if !url.contains("s3.amazonaws.com") {
            return Err(invalid());
        }
        let captures = S3_VIRTUAL_HOST.captures(url).ok_or_else(invalid)?;
        let host = captures.name("host").map(|m| m.as_str()).unwrap_or_default();
        let sections: Vec<&str> = host.split('.').collect();
        if sections.len() < 5 || !host.ends_with("s3.amazonaws.com") {
            return Err(invalid());
        }
        let key = captures
            .name("key")
            .map(|m| m.as_str().trim_start_matches('/'))
            .unwrap_or_default();
        if key.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            url: url.to_string(),
            bucket: sections[0].to_string(),
            region: sections[1].to_string(),
            key: key.to_string(),
        })
    }

    pub fn is_presigned(&self) -> bool {
        let Some((_, query)) = self.url.split_once('?') else {
            return false;
        };
        query
            .split('&')
            .filter_map(|pair| pair.split('=').next())
            .any(|name| name == "X-Amz-Signature" || name == "Signature")
    }
}

pub trait S3ObjectFetcher: Send + Sync {
    fn get_object(&self, location: &S3Location) -> Result<Vec<u8>, SracpError>;
}

pub struct AwsS3Fetcher {
    runtime: Runtime,
}

impl AwsS3Fetcher {
    pub fn new() -> Result<Self, SracpError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| SracpError::StorageHttp(err.to_string()))?;
        Ok(Self { runtime })
    }
}

impl S3ObjectFetcher for AwsS3Fetcher {
    fn get_object(&self, location: &S3Location) -> Result<Vec<u8>, SracpError> {
        self.runtime.block_on(async {
            let config = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(location.region.clone()))
                .load()
                .await;
            let client = aws_sdk_s3::Client::new(&config);

            let response = client
                .get_object()
                .bucket(&location.bucket)
                .key(&location.key)
                .send()
                .await
                .map_err(|err| match err.raw_response() {
                    Some(raw) => {
                        debug!("status code: {}", raw.status().as_u16());
                        status_error(raw.status().as_u16(), &location.url)
                    }
                    None => SracpError::StorageHttp(DisplayErrorContext(&err).to_string()),
                })?;
            let body = response
                .body
                .collect()
                .await
                .map_err(|err| SracpError::StorageHttp(err.to_string()))?;
            Ok(body.into_bytes().to_vec())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Path(PathBuf),
    S3(S3Location),
}

impl CredentialSource {
    pub fn parse(value: &str) -> Result<Self, SracpError> {
        let trimmed = value.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(Self::S3(S3Location::parse(trimmed)?));
        }
        Ok(Self::Path(PathBuf::from(trimmed)))
    }

    pub fn read(
        &self,
        reader: &dyn ObjectReader,
        s3: &dyn S3ObjectFetcher,
    ) -> Result<Vec<u8>, SracpError> {
        match self {
            CredentialSource::Path(path) => {
                fs::read(path).map_err(|err| SracpError::CredentialRead {
                    path: path.display().to_string(),
                    message: err.to_string(),
                })
            }
            CredentialSource::S3(location) => {
                debug!(
                    bucket = %location.bucket,
                    region = %location.region,
                    key = %location.key,
                    "reading ngc file from s3"
                );
                if location.is_presigned() {
                    return reader.read_bytes(&location.url);
                }
                s3.get_object(location)
            }
        }
    }
}
