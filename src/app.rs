use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::FileTypeFilter;
use crate::download::Downloader;
use crate::error::SracpError;
use crate::resolver::{Diagnostics, Manifest, NameResolver, RemoteFile, ResolveRequest};
use crate::store::Destination;

#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyAction {
    Downloaded,
    Planned,
    Filtered,
    Failed,
}

impl CopyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyAction::Downloaded => "downloaded",
            CopyAction::Planned => "planned",
            CopyAction::Filtered => "filtered",
            CopyAction::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyItemResult {
    pub accession: String,
    pub file_name: String,
    pub link: String,
    pub size: String,
    pub md5: String,
    pub action: CopyAction,
    pub path: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyResult {
    pub accessions: usize,
    pub items: Vec<CopyItemResult>,
    pub diagnostics: Diagnostics,
}

impl CopyResult {
    pub fn count(&self, action: CopyAction) -> usize {
        self.items.iter().filter(|item| item.action == action).count()
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<R: NameResolver, D: Downloader> {
    resolver: R,
    downloader: D,
}

impl<R: NameResolver, D: Downloader> App<R, D> {
    pub fn new(resolver: R, downloader: D) -> Self {
        Self {
            resolver,
            downloader,
        }
    }

    pub fn copy(
        &self,
        request: &ResolveRequest,
        destination: &Destination,
        only: &FileTypeFilter,
        options: CopyOptions,
        sink: &dyn ProgressSink,
    ) -> Result<CopyResult, SracpError> {
        sink.event(ProgressEvent {
            message: format!(
                "phase=Resolve; {} accession(s) via {}",
                request.accessions.len(),
                request.endpoint()
            ),
            elapsed: None,
        });
        let start = Instant::now();
        let resolution = self.resolver.resolve(request)?;
        sink.event(ProgressEvent {
            message: format!("resolver.response manifests={}", resolution.manifests.len()),
            elapsed: Some(start.elapsed()),
        });

        let mut items = Vec::new();
        for manifest in resolution.manifests.values() {
            self.copy_manifest(manifest, destination, only, &options, sink, &mut items);
        }

        Ok(CopyResult {
            accessions: resolution.manifests.len(),
            items,
            diagnostics: resolution.diagnostics,
        })
    }

    fn copy_manifest(
        &self,
        manifest: &Manifest,
        destination: &Destination,
        only: &FileTypeFilter,
        options: &CopyOptions,
        sink: &dyn ProgressSink,
        items: &mut Vec<CopyItemResult>,
    ) {
        if !options.dry_run {
            if let Err(err) = destination.ensure_accession_dir(&manifest.accession) {
                warn!("issue creating directory for {}: {err}", manifest.accession);
                for file in manifest.files.values() {
                    items.push(item(manifest, file, CopyAction::Failed, None, Some(err.to_string())));
                }
                return;
            }
        }

        for file in manifest.files.values() {
            if !only.accepts(&file.name) {
                items.push(item(manifest, file, CopyAction::Filtered, None, None));
                continue;
            }
            let path = match destination.file_path(&manifest.accession, &file.name) {
                Ok(path) => path,
                Err(err) => {
                    warn!("skipping {} of {}: {err}", file.name, manifest.accession);
                    items.push(item(manifest, file, CopyAction::Failed, None, Some(err.to_string())));
                    continue;
                }
            };
            if options.dry_run {
                items.push(item(
                    manifest,
                    file,
                    CopyAction::Planned,
                    Some(path.to_string()),
                    None,
                ));
                continue;
            }

            sink.event(ProgressEvent {
                message: format!("phase=Download; {}/{}", manifest.accession, file.name),
                elapsed: None,
            });
            let start = Instant::now();
            match self.downloader.download(&file.link, &path) {
                Ok(()) => {
                    info!("copied {} to {path}", file.name);
                    sink.event(ProgressEvent {
                        message: format!("download.done {}", file.name),
                        elapsed: Some(start.elapsed()),
                    });
                    items.push(item(
                        manifest,
                        file,
                        CopyAction::Downloaded,
                        Some(path.to_string()),
                        None,
                    ));
                }
                Err(err) => {
                    warn!("issue copying {}: {err}", file.link);
                    items.push(item(
                        manifest,
                        file,
                        CopyAction::Failed,
                        Some(path.to_string()),
                        Some(err.to_string()),
                    ));
                }
            }
        }
    }
}

fn item(
    manifest: &Manifest,
    file: &RemoteFile,
    action: CopyAction,
    path: Option<String>,
    error: Option<String>,
) -> CopyItemResult {
    CopyItemResult {
        accession: manifest.accession.clone(),
        file_name: file.name.clone(),
        link: file.link.clone(),
        size: file.size.clone(),
        md5: file.md5.clone(),
        action,
        path,
        error,
    }
}
