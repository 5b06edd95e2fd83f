use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::error::LoggerError;
use crate::fix::FixTime;

const GPX_PREAMBLE: &str =
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx version=\"1.0\">\n\t<trk><trkseg>\n";

/// Fixed trailing bytes that keep the document syntactically closed. Every
/// append rewrites this fragment in place, so its length must never change.
pub const GPX_EPILOGUE: &str = "\t</trkseg></trk>\n</gpx>\n";

const TRACK_EXTENSION: &str = "gpx";

// FAT-style volumes silently reject names longer than 8 characters plus a
// 3-character extension.
const SHORT_NAME_STEM: usize = 8;
const SHORT_NAME_EXT: usize = 3;

/// One open track file. At most one exists at a time; it stays open until
/// shutdown or until a write failure invalidates the handle.
#[derive(Debug)]
pub struct Session {
    pub(super) file: File,
    path: PathBuf,
}

impl Session {
    /// Open a new track file named `<base>/<YYYYMMDD>/<HHMMSS>.gpx` after the
    /// fix date/time and write the document skeleton. The file on disk is a
    /// complete zero-point document before this returns.
    pub fn create(base: &Path, time: &FixTime, offset_hours: i32) -> Result<Self, LoggerError> {
        let dir_name = format!("{:04}{:02}{:02}", time.year, time.month, time.day);
        let file_name = format!(
            "{:02}{:02}{:02}.{}",
            time.hour as i32 + offset_hours,
            time.minute,
            time.second,
            TRACK_EXTENSION
        );
        check_short_name(&dir_name)?;
        check_short_name(&file_name)?;

        let dir = base.join(dir_name);
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|source| LoggerError::DirectoryCreate {
                path: dir.clone(),
                source,
            })?;
        }

        let path = dir.join(file_name);
        info!("starting track file {}", path.display());
        if path.exists() {
            warn!("{} already exists, overwriting", path.display());
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| LoggerError::FileCreate {
                path: path.clone(),
                source,
            })?;

        file.write_all(GPX_PREAMBLE.as_bytes())?;
        file.write_all(GPX_EPILOGUE.as_bytes())?;
        file.sync_data()?;

        Ok(Session { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn check_short_name(name: &str) -> Result<(), LoggerError> {
    let (stem, extension) = name.rsplit_once('.').unwrap_or((name, ""));
    if stem.len() > SHORT_NAME_STEM || extension.len() > SHORT_NAME_EXT {
        return Err(LoggerError::NameTooLong(name.to_string()));
    }
    Ok(())
}
