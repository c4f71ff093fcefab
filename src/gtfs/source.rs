//! Access to the static GTFS tables, as loose files or inside a zip archive.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;
use zip::ZipArchive;

use crate::error::{Error, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Where the static tables live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GtfsSource {
    /// A directory holding `stops.txt`, `trips.txt`, `routes.txt`.
    Directory(PathBuf),
    /// A zip archive with those files at its root.
    Archive(PathBuf),
}

impl GtfsSource {
    /// Directories are read as loose files; anything else is opened as a zip.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            GtfsSource::Directory(path)
        } else {
            GtfsSource::Archive(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            GtfsSource::Directory(path) | GtfsSource::Archive(path) => path,
        }
    }

    /// Reads the raw bytes of one table.
    pub fn read_bytes(&self, name: &str) -> Result<Vec<u8>> {
        match self {
            GtfsSource::Directory(dir) => {
                let path = dir.join(name);
                std::fs::read(&path).map_err(|source| Error::DataAccess { path, source })
            }
            GtfsSource::Archive(path) => {
                let file = File::open(path).map_err(|source| Error::DataAccess {
                    path: path.clone(),
                    source,
                })?;
                let archive_error = |source| Error::Archive {
                    path: path.clone(),
                    member: name.to_string(),
                    source,
                };
                let mut archive = ZipArchive::new(file).map_err(archive_error)?;
                let mut member = archive.by_name(name).map_err(archive_error)?;

                let mut bytes = Vec::new();
                member
                    .read_to_end(&mut bytes)
                    .map_err(|source| Error::DataAccess {
                        path: path.join(name),
                        source,
                    })?;
                Ok(bytes)
            }
        }
    }

    /// Reads and deserializes every row of one table.
    pub fn read_table<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let bytes = self.read_bytes(name)?;
        let rows = parse_table(name, &bytes)?;
        debug!(
            source = %self.path().display(),
            table = name,
            rows = rows.len(),
            "Table parsed"
        );
        Ok(rows)
    }
}

/// Parses a header-delimited table, skipping a leading UTF-8 byte order mark.
pub fn parse_table<T: DeserializeOwned>(name: &str, bytes: &[u8]) -> Result<Vec<T>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut rdr = csv::Reader::from_reader(bytes);

    rdr.deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|source| Error::Format {
            table: name.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs::model::Route;

    #[test]
    fn test_parse_table_strips_bom() {
        let data = b"\xEF\xBB\xBFroute_id,route_short_name\n24,24\n";
        let routes: Vec<Route> = parse_table("routes.txt", data).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].route_id, "24");
    }

    #[test]
    fn test_parse_table_reports_table_name() {
        let data = b"route_short_name\n24\n";
        let err = parse_table::<Route>("routes.txt", data).unwrap_err();
        assert!(matches!(err, Error::Format { ref table, .. } if table == "routes.txt"));
    }

    #[test]
    fn test_missing_directory_member_is_data_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = GtfsSource::from_path(dir.path());
        assert_eq!(source, GtfsSource::Directory(dir.path().to_path_buf()));
        assert_eq!(source.path(), dir.path());

        let err = source.read_bytes("stops.txt").unwrap_err();
        assert!(matches!(err, Error::DataAccess { .. }));
    }

    #[test]
    fn test_missing_archive_is_data_access_error() {
        let source = GtfsSource::from_path("/nonexistent/gtfs.zip");
        let err = source.read_bytes("stops.txt").unwrap_err();
        assert!(matches!(err, Error::DataAccess { .. }));
    }
}
