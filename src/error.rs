use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SracpError {
    #[error("invalid accession: {0:?}")]
    InvalidAccession(String),

    #[error("invalid file type filter: {0:?}")]
    InvalidFileType(String),

    #[error("no accessions given (use --accession or --accession-file)")]
    NoAccessions,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read accession file at {0}")]
    AccessionFileRead(PathBuf),

    #[error("could not build Name Resolver request: {0}")]
    RequestBuild(String),

    #[error("Name Resolver request failed: {0}")]
    ResolverHttp(String),

    #[error("encountered error from Name Resolver API: {0}")]
    ResolverStatus(String),

    #[error("Name Resolver API gave incorrect Content-Type: {0}")]
    ContentType(String),

    #[error("could not read response from Name Resolver API")]
    Undecodable,

    #[error("encountered error from Name Resolver API: {status}: {message}")]
    ResolverRejected { status: i64, message: String },

    #[error("API returned no usable accessions\n{diagnostics}")]
    #[diagnostic(help("every requested accession failed or listed no downloadable files"))]
    NothingResolved { diagnostics: String },

    #[error(
        "url does not follow the virtual-hosted style https://[bucket].[region].s3.amazonaws.com/[file]: {0}"
    )]
    InvalidCredentialUrl(String),

    #[error("failed to read ngc file {path}: {message}")]
    CredentialRead { path: String, message: String },

    #[error("object storage request failed: {0}")]
    StorageHttp(String),

    #[error("not authorized to read {0}")]
    Unauthorized(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("method not supported for {0}")]
    MethodNotSupported(String),

    #[error("object storage server error {status} for {url}")]
    ServerError { status: u16, url: String },

    #[error("object storage returned status {status} for {url}")]
    StorageStatus { status: u16, url: String },

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
