//! Lookup and cleanup of freedesktop trash records.
//!
//! The trash lives under `$data_home/Trash`: trashed entries are stored in
//! `files/`, and each has a sidecar `info/<name>.trashinfo` record holding the
//! percent-encoded original path and the local deletion time.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, TimeZone};
use hyperplane_core::{HyperplaneConfig, OpsError};

/// Extension of trash metadata records.
pub const TRASHINFO_EXTENSION: &str = "trashinfo";

const TRASH_INFO_GROUP: &str = "[Trash Info]";
const DELETION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A trashed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashRecord {
    /// Where the entry is stored inside the trash.
    pub storage_path: PathBuf,
    /// Where the entry lived before it was trashed.
    pub original_path: PathBuf,
    /// Deletion time as a Unix timestamp.
    pub deleted_at: i64,
}

/// Parsed contents of a `.trashinfo` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashInfo {
    /// The decoded original path.
    pub original_path: PathBuf,
    /// The deletion time, in local time.
    pub deletion_date: Option<NaiveDateTime>,
}

impl TrashInfo {
    /// Parse a `.trashinfo` record. Returns `None` without a `Path` key.
    pub fn parse(text: &str) -> Option<Self> {
        let mut in_group = false;
        let mut path = None;
        let mut deletion_date = None;

        for line in text.lines().map(str::trim) {
            if line.starts_with('[') {
                in_group = line == TRASH_INFO_GROUP;
                continue;
            }
            if !in_group {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                "Path" => path = Some(decode_path(value.trim())),
                "DeletionDate" => {
                    deletion_date =
                        NaiveDateTime::parse_from_str(value.trim(), DELETION_DATE_FORMAT).ok()
                }
                _ => {}
            }
        }

        Some(Self {
            original_path: path?,
            deletion_date,
        })
    }

    /// Render this record in `.trashinfo` form.
    #[cfg(test)]
    pub(crate) fn render(&self) -> String {
        let mut text = format!(
            "{TRASH_INFO_GROUP}\nPath={}\n",
            encode_path(&self.original_path)
        );
        if let Some(date) = self.deletion_date {
            text.push_str(&format!("DeletionDate={}\n", date.format(DELETION_DATE_FORMAT)));
        }
        text
    }

    /// The deletion time as a Unix timestamp, interpreting the record in local time.
    pub fn deleted_at(&self) -> Option<i64> {
        self.deletion_date
            .and_then(|date| Local.from_local_datetime(&date).earliest())
            .map(|date| date.timestamp())
    }
}

/// Percent-encode the raw bytes of a path, keeping `/` separators.
#[cfg(test)]
pub(crate) fn encode_path(path: &Path) -> String {
    path.as_os_str()
        .as_encoded_bytes()
        .split(|byte| *byte == b'/')
        .map(|segment| urlencoding::encode_binary(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-decode a stored path, keeping non-UTF-8 bytes intact on Unix.
pub fn decode_path(encoded: &str) -> PathBuf {
    let bytes = urlencoding::decode_binary(encoded.as_bytes());

    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        PathBuf::from(std::ffi::OsStr::from_bytes(&bytes))
    }

    #[cfg(not(unix))]
    {
        PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Index over the trash directory. Nothing is cached; every call re-reads it.
#[derive(Debug, Clone)]
pub struct TrashIndex {
    files_dir: PathBuf,
    info_dir: PathBuf,
}

impl TrashIndex {
    /// Create an index for the trash configured in `config`.
    pub fn new(config: &HyperplaneConfig) -> Self {
        Self {
            files_dir: config.trash_files_dir(),
            info_dir: config.trash_info_dir(),
        }
    }

    /// Directory holding trashed entries.
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Directory holding `.trashinfo` records.
    pub fn info_dir(&self) -> &Path {
        &self.info_dir
    }

    /// The metadata record path for a trashed entry stored as `name`.
    pub fn info_path(&self, name: impl AsRef<OsStr>) -> PathBuf {
        let mut file_name = name.as_ref().to_os_string();
        file_name.push(".");
        file_name.push(TRASHINFO_EXTENSION);
        self.info_dir.join(file_name)
    }

    /// Find the entry deleted from `original_path` at exactly `deleted_at`.
    ///
    /// The path must match byte for byte and the timestamp exactly; the
    /// first match wins.
    pub fn lookup(&self, original_path: &Path, deleted_at: i64) -> Result<TrashRecord, OpsError> {
        let entries = match fs::read_dir(&self.files_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OpsError::not_found(original_path));
            }
            Err(e) => return Err(OpsError::io(&self.files_dir, e)),
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(info) = self.read_info(&name) else {
                continue;
            };

            if info.original_path.as_os_str() != original_path.as_os_str() {
                continue;
            }
            if info.deleted_at() != Some(deleted_at) {
                continue;
            }

            return Ok(TrashRecord {
                storage_path: entry.path(),
                original_path: info.original_path,
                deleted_at,
            });
        }

        Err(OpsError::not_found(original_path))
    }

    /// The record for the entry stored as `name`.
    pub fn record_for(&self, name: impl AsRef<OsStr>) -> Result<TrashRecord, OpsError> {
        let name = name.as_ref();
        let storage_path = self.files_dir.join(name);
        if storage_path.symlink_metadata().is_err() {
            return Err(OpsError::not_found(storage_path));
        }

        let info = self
            .read_info(name)
            .ok_or_else(|| OpsError::not_found(self.info_path(name)))?;

        Ok(TrashRecord {
            storage_path,
            deleted_at: info.deleted_at().unwrap_or_default(),
            original_path: info.original_path,
        })
    }

    /// Every trashed entry that has a readable record.
    pub fn records(&self) -> Result<Vec<TrashRecord>, OpsError> {
        let entries = match fs::read_dir(&self.files_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(OpsError::io(&self.files_dir, e)),
        };

        Ok(entries
            .flatten()
            .filter_map(|entry| self.record_for(entry.file_name()).ok())
            .collect())
    }

    /// Remove the metadata record of the entry stored at `storage_path`.
    ///
    /// The record is only deleted if its original path matches
    /// `original_path`. Missing or unreadable records and failed removals
    /// are ignored.
    pub fn remove_record(&self, storage_path: &Path, original_path: &Path) {
        let Some(name) = storage_path.file_name() else {
            return;
        };
        let info_path = self.info_path(name);

        let Some(info) = fs::read_to_string(&info_path)
            .ok()
            .and_then(|text| TrashInfo::parse(&text))
        else {
            tracing::debug!(path = %info_path.display(), "no readable trash record");
            return;
        };

        if info.original_path.as_os_str() != original_path.as_os_str() {
            tracing::warn!(
                path = %info_path.display(),
                expected = %original_path.display(),
                found = %info.original_path.display(),
                "trash record belongs to another entry, keeping it"
            );
            return;
        }

        if let Err(e) = fs::remove_file(&info_path) {
            tracing::warn!(path = %info_path.display(), error = %e, "failed to remove trash record");
        }
    }

    fn read_info(&self, name: &OsStr) -> Option<TrashInfo> {
        let text = fs::read_to_string(self.info_path(name)).ok()?;
        TrashInfo::parse(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trashinfo() {
        let info = TrashInfo::parse(
            "[Trash Info]\nPath=/home/user/My%20Notes/a%25b.txt\nDeletionDate=2024-03-01T10:20:30\n",
        )
        .unwrap();

        assert_eq!(info.original_path, PathBuf::from("/home/user/My Notes/a%b.txt"));
        assert_eq!(
            info.deletion_date.unwrap().format(DELETION_DATE_FORMAT).to_string(),
            "2024-03-01T10:20:30"
        );
    }

    #[test]
    fn test_parse_requires_path_in_group() {
        assert!(TrashInfo::parse("[Other]\nPath=/a\n").is_none());
        assert!(TrashInfo::parse("garbage").is_none());
    }

    #[test]
    fn test_render_round_trips() {
        let info = TrashInfo {
            original_path: PathBuf::from("/home/user/odd name #1/ü.txt"),
            deletion_date: NaiveDateTime::parse_from_str("2023-12-31T23:59:59", DELETION_DATE_FORMAT)
                .ok(),
        };

        let rendered = info.render();
        assert!(rendered.contains("Path=/home/user/odd%20name%20%231/"));
        assert_eq!(TrashInfo::parse(&rendered).unwrap(), info);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_stay_intact() {
        use std::os::unix::ffi::OsStrExt;

        let name = OsStr::from_bytes(b"caf\xe9.txt");
        let index = TrashIndex {
            files_dir: PathBuf::from("/trash/files"),
            info_dir: PathBuf::from("/trash/info"),
        };
        assert_eq!(
            index.info_path(name).as_os_str().as_bytes(),
            b"/trash/info/caf\xe9.txt.trashinfo"
        );

        let original = Path::new("/home").join(name);
        assert_eq!(encode_path(&original), "/home/caf%E9.txt");
        assert_eq!(decode_path(&encode_path(&original)), original);
    }
}
