use std::fs;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::{Builder, NamedTempFile};

use crate::error::SracpError;

#[derive(Debug, Clone)]
pub struct Destination {
    root: Utf8PathBuf,
}

impl Destination {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn accession_dir(&self, accession: &str) -> Result<Utf8PathBuf, SracpError> {
        check_component(accession)?;
        Ok(self.root.join(accession))
    }

    pub fn file_path(&self, accession: &str, file_name: &str) -> Result<Utf8PathBuf, SracpError> {
        check_component(file_name)?;
        Ok(self.accession_dir(accession)?.join(file_name))
    }

    pub fn ensure_accession_dir(&self, accession: &str) -> Result<Utf8PathBuf, SracpError> {
        let dir = self.accession_dir(accession)?;
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| SracpError::Filesystem(format!("create {dir}: {err}")))?;
        Ok(dir)
    }

    pub fn temp_file_for(dest: &Utf8Path) -> Result<NamedTempFile, SracpError> {
        let parent = dest
            .parent()
            .ok_or_else(|| SracpError::Filesystem("invalid destination path".to_string()))?;
        Builder::new()
            .prefix(".sracp-part")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| SracpError::Filesystem(err.to_string()))
    }

    pub fn persist(temp: NamedTempFile, dest: &Utf8Path) -> Result<(), SracpError> {
        temp.persist(dest.as_std_path())
            .map_err(|err| SracpError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

fn check_component(value: &str) -> Result<(), SracpError> {
    let path = Path::new(value);
    let single = path.components().count() == 1
        && matches!(
            path.components().next(),
            Some(std::path::Component::Normal(_))
        );
    if value.is_empty() || !single || value.contains('\\') {
        return Err(SracpError::Filesystem(format!(
            "refusing unsafe path component: {value:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let dest = Destination::new(Utf8PathBuf::from("/data"));
        let path = dest.file_path("SRR000001", "a.bam").unwrap();
        assert_eq!(path, Utf8PathBuf::from("/data/SRR000001/a.bam"));
    }

    #[test]
    fn rejects_traversal() {
        let dest = Destination::new(Utf8PathBuf::from("/data"));
        assert!(dest.file_path("SRR000001", "../a.bam").is_err());
        assert!(dest.file_path("SRR000001", "x/a.bam").is_err());
        assert!(dest.file_path("..", "a.bam").is_err());
        assert!(dest.accession_dir("").is_err());
    }

    #[test]
    fn persist_replaces_existing_file() {
        let temp = tempfile::tempdir().unwrap();
        let dest = Utf8PathBuf::from_path_buf(temp.path().join("a.bam")).unwrap();
        fs::write(dest.as_std_path(), b"old").unwrap();

        let mut part = Destination::temp_file_for(&dest).unwrap();
        std::io::Write::write_all(&mut part, b"new").unwrap();
        Destination::persist(part, &dest).unwrap();

        assert_eq!(fs::read(dest.as_std_path()).unwrap(), b"new");
        let leftovers = fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
