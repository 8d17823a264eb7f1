use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{AccessionSet, FileTypeFilter, parse_accession_file, parse_accession_list};
use crate::error::SracpError;
use crate::storage::CredentialSource;

pub const CONFIG_FILE: &str = "sracp.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub ngc: Option<String>,
    #[serde(default)]
    pub accessions: Vec<String>,
    #[serde(default)]
    pub accession_file: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub only: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub location: Option<String>,
    pub ngc: Option<String>,
    pub accessions: Vec<String>,
    pub accession_file: Option<String>,
    pub destination: Option<String>,
    pub only: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub endpoint: Option<String>,
    pub location: Option<String>,
    pub ngc: Option<CredentialSource>,
    pub accessions: AccessionSet,
    pub destination: Utf8PathBuf,
    pub only: FileTypeFilter,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, SracpError> {
        let config = match path {
            Some(path) => Self::load(PathBuf::from(path))?,
            None => {
                let default_path = PathBuf::from(CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)?
                } else {
                    Config::default()
                }
            }
        };
        Self::resolve_config(Self::merge(config, overrides))
    }

    fn load(path: PathBuf) -> Result<Config, SracpError> {
        let content = fs::read_to_string(&path).map_err(|_| SracpError::ConfigRead(path.clone()))?;
        serde_json::from_str(&content).map_err(|err| SracpError::ConfigParse(err.to_string()))
    }

    pub fn merge(config: Config, overrides: ConfigOverrides) -> Config {
        Config {
            endpoint: overrides.endpoint.or(config.endpoint),
            location: overrides.location.or(config.location),
            ngc: overrides.ngc.or(config.ngc),
            accessions: if overrides.accessions.is_empty() {
                config.accessions
            } else {
                overrides.accessions
            },
            accession_file: overrides.accession_file.or(config.accession_file),
            destination: overrides.destination.or(config.destination),
            only: if overrides.only.is_empty() {
                config.only
            } else {
                overrides.only
            },
        }
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, SracpError> {
        let mut accessions = parse_accession_list(config.accessions.iter().map(String::as_str))?;
        if let Some(file) = &config.accession_file {
            let path = PathBuf::from(file);
            let content =
                fs::read_to_string(&path).map_err(|_| SracpError::AccessionFileRead(path))?;
            accessions.extend(parse_accession_file(&content)?);
        }
        if accessions.is_empty() {
            return Err(SracpError::NoAccessions);
        }

        let ngc = config
            .ngc
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(CredentialSource::parse)
            .transpose()?;

        let only = config.only.join(",").parse::<FileTypeFilter>()?;

        Ok(ResolvedConfig {
            endpoint: config.endpoint.filter(|value| !value.trim().is_empty()),
            location: config.location.filter(|value| !value.trim().is_empty()),
            ngc,
            accessions,
            destination: config
                .destination
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| Utf8PathBuf::from(".")),
            only,
        })
    }
}
