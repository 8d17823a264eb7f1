use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::AccessionSet;
use crate::error::SracpError;

pub const DEFAULT_ENDPOINT: &str = "https://www.ncbi.nlm.nih.gov/Traces/names/names.fcgi";
pub const PROTOCOL_VERSION: &str = "xc-1.0";

const STATUS_OK: i64 = 200;

#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub endpoint: Option<String>,
    pub location: Option<String>,
    pub ngc: Option<Vec<u8>>,
    pub accessions: AccessionSet,
}

impl ResolveRequest {
    pub fn endpoint(&self) -> &str {
        match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => endpoint,
            _ => DEFAULT_ENDPOINT,
        }
    }

    pub fn location(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteFile {
    pub name: String,
    pub size: String,
    #[serde(rename = "modificationDate", skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<DateTime<Utc>>,
    pub md5: String,
    pub link: String,
    #[serde(rename = "expirationDate", skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    pub service: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WirePayload {
    pub accession: String,
    pub status: i64,
    pub message: String,
    pub files: Vec<RemoteFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Manifest {
    pub accession: String,
    pub files: BTreeMap<String, RemoteFile>,
}

impl Manifest {
    pub fn new(accession: impl Into<String>) -> Self {
        Self {
            accession: accession.into(),
            files: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    lines: Vec<String>,
}

impl Diagnostics {
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn message(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    pub manifests: BTreeMap<String, Manifest>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolverResponse {
    Batch(Vec<WirePayload>),
    Failure(WirePayload),
}

impl ResolverResponse {
    pub fn decode(body: &[u8]) -> Result<Self, SracpError> {
        if let Ok(payloads) = serde_json::from_slice::<Vec<WirePayload>>(body) {
            return Ok(Self::Batch(payloads));
        }
        match serde_json::from_slice::<WirePayload>(body) {
            Ok(payload) => Ok(Self::Failure(payload)),
            Err(err) => {
                debug!("undecodable resolver body: {err}");
                Err(SracpError::Undecodable)
            }
        }
    }
}

pub fn reconcile_body(body: &[u8]) -> Result<Resolution, SracpError> {
    match ResolverResponse::decode(body)? {
        ResolverResponse::Batch(payloads) => reconcile(payloads),
        ResolverResponse::Failure(payload) => Err(SracpError::ResolverRejected {
            status: payload.status,
            message: payload.message,
        }),
    }
}

pub fn reconcile(payloads: Vec<WirePayload>) -> Result<Resolution, SracpError> {
    let mut manifests: BTreeMap<String, Manifest> = BTreeMap::new();
    let mut diagnostics = Diagnostics::default();
    let mut failures = Vec::new();
    let mut file_issues = Vec::new();

    for payload in payloads {
        if payload.status != STATUS_OK {
            diagnostics.push(format!(
                "issue with accession {}: {}",
                payload.accession, payload.message
            ));
            failures.push(format!(
                "{}: {}\t{}",
                payload.accession, payload.status, payload.message
            ));
            continue;
        }

        let manifest = manifests
            .entry(payload.accession.clone())
            .or_insert_with(|| Manifest::new(payload.accession.clone()));
        for file in payload.files {
            let issue = if file.link.is_empty() {
                Some(format!("API returned no link for {}", file.name))
            } else if file.name.is_empty() {
                Some(format!("API returned no name for file {}", file.link))
            } else {
                None
            };
            if let Some(issue) = issue {
                diagnostics.push(format!(
                    "issue with accession {}: {issue}",
                    payload.accession
                ));
                file_issues.push(format!("{}: {issue}", payload.accession));
                continue;
            }
            manifest.files.insert(file.name.clone(), file);
        }
    }

    if manifests.values().all(|manifest| manifest.files.is_empty()) {
        let mut trail = failures;
        trail.extend(file_issues);
        if trail.is_empty() {
            trail.push("resolver listed no files".to_string());
        }
        return Err(SracpError::NothingResolved {
            diagnostics: trail.join("\n"),
        });
    }

    Ok(Resolution {
        manifests,
        diagnostics,
    })
}

pub trait NameResolver: Send + Sync {
    fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, SracpError>;
}

#[derive(Clone)]
pub struct NameResolverHttpClient {
    client: Client,
}

impl NameResolverHttpClient {
    pub fn new() -> Result<Self, SracpError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("sracp/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SracpError::RequestBuild(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| SracpError::ResolverHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

pub fn build_form(request: &ResolveRequest) -> Result<Form, SracpError> {
    let mut form = Form::new();
    if let Some(ngc) = &request.ngc {
        let part = Part::bytes(ngc.clone())
            .file_name("ngc")
            .mime_str("application/octet-stream")
            .map_err(|err| {
                SracpError::RequestBuild(format!("couldn't create form file for ngc: {err}"))
            })?;
        form = form.part("ngc", part);
    }
    form = form
        .text("version", PROTOCOL_VERSION)
        .text("format", "json");
    if let Some(location) = request.location() {
        form = form.text("location", location.to_string());
    }
    for accession in &request.accessions {
        form = form.text("acc", accession.as_str().to_string());
    }
    Ok(form)
}

impl NameResolver for NameResolverHttpClient {
    fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, SracpError> {
        if request.endpoint.as_deref().is_none_or(|value| value.trim().is_empty()) {
            debug!("Name Resolver endpoint was empty, using default: {DEFAULT_ENDPOINT}");
        }
        let endpoint = request.endpoint();
        let form = build_form(request)?;
        debug!(
            version = PROTOCOL_VERSION,
            format = "json",
            location = request.location().unwrap_or(""),
            ngc = request.ngc.is_some(),
            accessions = request.accessions.len(),
            "resolving names via {endpoint}"
        );

        let response = self
            .client
            .post(endpoint)
            .multipart(form)
            .send()
            .map_err(|err| SracpError::ResolverHttp(err.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SracpError::ResolverStatus(status.to_string()));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if content_type != "application/json" {
            return Err(SracpError::ContentType(content_type));
        }

        let body = response
            .bytes()
            .map_err(|err| SracpError::ResolverHttp(err.to_string()))?;
        debug!("response body from API:\n{}", String::from_utf8_lossy(&body));

        let resolution = reconcile_body(&body)?;
        for line in resolution.diagnostics.lines() {
            warn!("{line}");
        }
        Ok(resolution)
    }
}
