use std::path::{Path, PathBuf};
use std::process::Command;

use camino::Utf8Path;
use serde::Serialize;
use tracing::debug;

use crate::error::SracpError;
use crate::store::Destination;

pub trait Downloader: Send + Sync {
    fn download(&self, link: &str, destination: &Utf8Path) -> Result<(), SracpError>;
    fn tool_info(&self) -> ToolInfo;
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub curl: Option<String>,
}

#[derive(Clone)]
pub struct CurlDownloader {
    curl: PathBuf,
}

impl CurlDownloader {
    pub fn new() -> Result<Self, SracpError> {
        let curl = find_in_path("curl").ok_or_else(|| SracpError::MissingTool("curl".to_string()))?;
        Ok(Self { curl })
    }

    pub fn with_program(curl: PathBuf) -> Self {
        Self { curl }
    }

    fn run_cmd(&self, args: &[String]) -> Result<(), SracpError> {
        debug!("running {} {}", self.curl.display(), args.join(" "));
        let output = Command::new(&self.curl)
            .args(args)
            .output()
            .map_err(|err| SracpError::Download(err.to_string()))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("command failed: {}", self.curl.display())
        } else {
            stderr
        };
        Err(SracpError::Download(message))
    }
}

impl Downloader for CurlDownloader {
    fn download(&self, link: &str, destination: &Utf8Path) -> Result<(), SracpError> {
        let temp = Destination::temp_file_for(destination)?;
        let args = vec![
            "--fail".to_string(),
            "--silent".to_string(),
            "--show-error".to_string(),
            "--location".to_string(),
            "-o".to_string(),
            temp.path().to_string_lossy().to_string(),
            link.to_string(),
        ];
        self.run_cmd(&args)?;
        Destination::persist(temp, destination)
    }

    fn tool_info(&self) -> ToolInfo {
        ToolInfo {
            curl: tool_version(&self.curl, &["--version"]),
        }
    }
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.is_file() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}

fn tool_version(path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(path).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next()?.trim().to_string();
    if first.is_empty() { None } else { Some(first) }
}
