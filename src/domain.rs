use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SracpError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = SracpError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && !trimmed
                .chars()
                .any(|ch| ch.is_whitespace() || ch.is_control() || ch == ',');
        if !is_valid {
            return Err(SracpError::InvalidAccession(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

pub type AccessionSet = BTreeSet<Accession>;

pub fn parse_accession_list<'a, I>(values: I) -> Result<AccessionSet, SracpError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut set = AccessionSet::new();
    for value in values {
        for item in value.split(',') {
            if item.trim().is_empty() {
                continue;
            }
            set.insert(item.parse()?);
        }
    }
    Ok(set)
}

pub fn parse_accession_file(content: &str) -> Result<AccessionSet, SracpError> {
    let lines = content
        .lines()
        .map(|line| line.split_once('#').map(|(head, _)| head).unwrap_or(line));
    parse_accession_list(lines)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTypeFilter(BTreeSet<String>);

impl FileTypeFilter {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn accepts(&self, file_name: &str) -> bool {
        if self.0.is_empty() {
            return true;
        }
        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|value| value.to_str())
            .map(|value| value.to_ascii_lowercase());
        match ext {
            Some(ext) => self.0.contains(&ext),
            None => false,
        }
    }
}

impl FromStr for FileTypeFilter {
    type Err = SracpError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut types = BTreeSet::new();
        for item in value.split(',') {
            let normalized = item.trim().trim_start_matches('.').to_ascii_lowercase();
            if normalized.is_empty() {
                continue;
            }
            if !normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
            {
                return Err(SracpError::InvalidFileType(item.to_string()));
            }
            types.insert(normalized);
        }
        Ok(Self(types))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_accession_trims() {
        let acc: Accession = "  SRR000001 ".parse().unwrap();
        assert_eq!(acc.as_str(), "SRR000001");
    }

    #[test]
    fn parse_accession_invalid() {
        let err = "".parse::<Accession>().unwrap_err();
        assert_matches!(err, SracpError::InvalidAccession(_));
        let err = "SRR 1".parse::<Accession>().unwrap_err();
        assert_matches!(err, SracpError::InvalidAccession(_));
    }

    #[test]
    fn accession_list_collapses_duplicates() {
        let set = parse_accession_list(["SRR000001,SRR000002", "SRR000001", ""]).unwrap();
        let ids: Vec<_> = set.iter().map(Accession::as_str).collect();
        assert_eq!(ids, vec!["SRR000001", "SRR000002"]);
    }

    #[test]
    fn accession_file_skips_comments() {
        let content = "# batch 1\nSRR000001\n\nSRR000002, SRR000003 # trailing\n";
        let set = parse_accession_file(content).unwrap();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn file_type_filter_matches_extension() {
        let filter: FileTypeFilter = "bam,.CRAI".parse().unwrap();
        assert!(filter.accepts("a.bam"));
        assert!(filter.accepts("a.bam.crai"));
        assert!(!filter.accepts("a.vcf"));
        assert!(!filter.accepts("README"));
    }

    #[test]
    fn empty_file_type_filter_accepts_all() {
        let filter = FileTypeFilter::default();
        assert!(filter.accepts("anything"));
    }
}
