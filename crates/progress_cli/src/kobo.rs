use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use walkdir::WalkDir;

/// Volume label Kobo devices mount under.
pub const VOLUME_LABEL: &str = "KOBOeReader";

const IMAGES_DIR: &str = ".kobo-images";
const COVER_SUFFIX: &str = "N3_LIBRARY_GRID.parsed";

const RECENTLY_READ_QUERY: &str = "SELECT ImageID \
     FROM content \
     WHERE ReadStatus = 2 AND DateLastRead > datetime('now', 'start of year') \
     ORDER BY DateLastRead DESC";

pub fn database_path(mount: &Path) -> PathBuf {
    mount.join(".kobo").join("KoboReader.sqlite")
}

pub fn is_kobo_mount(path: &Path) -> bool {
    database_path(path).is_file()
}

/// Probes the usual mount points for a connected device.
pub fn locate_mount() -> Option<PathBuf> {
    mount_candidates().into_iter().find(|path| is_kobo_mount(path))
}

fn mount_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(user) = env::var_os("USER") {
        candidates.push(Path::new("/media").join(&user).join(VOLUME_LABEL));
        candidates.push(Path::new("/run/media").join(&user).join(VOLUME_LABEL));
    }
    candidates.push(Path::new("/media").join(VOLUME_LABEL));
    candidates.push(Path::new("/mnt").join(VOLUME_LABEL));
    candidates.push(Path::new("/Volumes").join(VOLUME_LABEL));

    if cfg!(windows) {
        candidates
            .extend((b'D'..=b'Z').map(|letter| PathBuf::from(format!("{}:\\", letter as char))));
    }

    candidates
}

/// Where the device picks up custom screensavers for `year`.
pub fn screensaver_path(mount: &Path, year: i32) -> PathBuf {
    mount.join(".kobo").join("screensaver").join(format!("{year}Progress.png"))
}

/// Read-only handle on the device's library database.
pub struct Library {
    conn: Connection,
}

impl Library {
    pub fn open(mount: &Path) -> Result<Self> {
        let path = database_path(mount);
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open library database {:?}", path))?;
        Ok(Self { conn })
    }

    /// Image ids of books finished this year, most recently read first.
    pub fn recently_read_image_ids(&self) -> Result<Vec<String>> {
        let mut statement = self
            .conn
            .prepare(RECENTLY_READ_QUERY)
            .context("failed to prepare recently read query")?;
        let ids = statement
            .query_map([], |row| row.get::<_, Option<String>>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read recently read books")?;
        Ok(ids.into_iter().flatten().filter(|id| !id.is_empty()).collect())
    }
}

/// Library grid thumbnails found under the device's image cache.
#[derive(Debug, Default)]
pub struct CoverIndex {
    entries: Vec<(String, PathBuf)>,
}

impl CoverIndex {
    pub fn scan(mount: &Path) -> Self {
        let entries = WalkDir::new(mount.join(IMAGES_DIR))
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_owned();
                name.ends_with(COVER_SUFFIX).then(|| (name, entry.into_path()))
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn find(&self, image_id: &str) -> Option<&Path> {
        if image_id.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(name, _)| name.starts_with(image_id))
            .map(|(_, path)| path.as_path())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const STAMP: &str = "%Y-%m-%dT%H:%M:%SZ";

    fn create_library(mount: &Path) {
        let path = database_path(mount);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE content (
                ContentID TEXT PRIMARY KEY,
                ImageID TEXT,
                ReadStatus INTEGER,
                DateLastRead TEXT
            );",
        )
        .unwrap();

        let rows: &[(&str, Option<&str>, i64, &str)] = &[
            ("early", Some("early-id"), 2, "'now', 'start of year', '+1 second'"),
            ("latest", Some("latest-id"), 2, "'now'"),
            ("reading", Some("reading-id"), 1, "'now'"),
            ("last-year", Some("old-id"), 2, "'now', 'start of year', '-1 day'"),
            ("no-image", None, 2, "'now'"),
        ];
        for (content_id, image_id, status, modifiers) in rows {
            conn.execute(
                &format!(
                    "INSERT INTO content VALUES (?1, ?2, ?3, strftime('{STAMP}', {modifiers}))"
                ),
                rusqlite::params![content_id, image_id, status],
            )
            .unwrap();
        }
    }

    #[test]
    fn recently_read_filters_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        create_library(dir.path());

        let library = Library::open(dir.path()).unwrap();
        let ids = library.recently_read_image_ids().unwrap();
        assert_eq!(ids, vec!["latest-id".to_string(), "early-id".to_string()]);
    }

    #[test]
    fn missing_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_kobo_mount(dir.path()));
        assert!(Library::open(dir.path()).is_err());
    }

    #[test]
    fn mount_is_recognised_by_database() {
        let dir = tempfile::tempdir().unwrap();
        create_library(dir.path());
        assert!(is_kobo_mount(dir.path()));
    }

    #[test]
    fn cover_index_matches_grid_thumbnails_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join(IMAGES_DIR).join("12").join("34");
        fs::create_dir_all(&nested).unwrap();
        for name in [
            "book-a - N3_FULL.parsed",
            "book-a - N3_LIBRARY_GRID.parsed",
            "book-b - N3_LIBRARY_GRID.parsed",
        ] {
            fs::write(nested.join(name), b"").unwrap();
        }

        let index = CoverIndex::scan(dir.path());
        assert_eq!(index.len(), 2);
        let expected = nested.join("book-a - N3_LIBRARY_GRID.parsed");
        assert_eq!(index.find("book-a"), Some(expected.as_path()));
        assert!(index.find("book-c").is_none());
        assert!(index.find("").is_none());
    }

    #[test]
    fn cover_index_of_missing_cache_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(CoverIndex::scan(dir.path()).len(), 0);
    }

    #[test]
    fn screensaver_lands_in_device_folder() {
        let path = screensaver_path(Path::new("/mnt/kobo"), 2026);
        assert_eq!(path, Path::new("/mnt/kobo/.kobo/screensaver/2026Progress.png"));
    }
}
