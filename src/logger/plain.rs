use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{error, info, warn};

const LOG_FILE_NAME: &str = "Logfile.txt";

/// Boundary to the passive file-transfer server that exposes the plain log
/// volume. The logger only starts it, polls it, and stops it; the protocol
/// itself lives behind this trait.
pub trait TransferService {
    fn start(&mut self, user: &str, password: &str) -> std::io::Result<()>;
    /// Service pending protocol requests. Called once per driver iteration.
    fn service(&mut self);
    fn stop(&mut self);
}

/// Stand-in transfer backend: accepts the credentials and has nothing to
/// service. Swap a protocol implementation in behind the same trait.
pub struct IdleTransfer;

impl TransferService for IdleTransfer {
    fn start(&mut self, user: &str, _password: &str) -> std::io::Result<()> {
        info!("transfer service ready, user {user}");
        Ok(())
    }

    fn service(&mut self) {}

    fn stop(&mut self) {}
}

/// Append-only text logging to a flat volume, plus the transfer service that
/// lets the log be pulled off the device.
pub struct PlainLogger {
    volume: PathBuf,
    capacity_bytes: u64,
    user: String,
    password: String,
    transfer: Box<dyn TransferService>,
    file: Option<File>,
}

impl PlainLogger {
    pub fn new(
        volume: PathBuf,
        capacity_bytes: u64,
        user: String,
        password: String,
        transfer: Box<dyn TransferService>,
    ) -> Self {
        Self {
            volume,
            capacity_bytes,
            user,
            password,
            transfer,
            file: None,
        }
    }

    /// Mount the volume, open the log file in append mode, write the
    /// session-start banner and bring up the transfer service.
    pub fn setup(&mut self) {
        if !self.volume.is_dir() {
            error!("unable to mount log volume {}", self.volume.display());
            return;
        }

        let free = self.capacity_bytes.saturating_sub(used_bytes(&self.volume));
        let path = self.volume.join(LOG_FILE_NAME);
        let mut file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(e) => {
                error!("unable to open log file {}: {e}", path.display());
                return;
            }
        };

        let banner = format!(
            "\n******* Logging restarted {} *******\n*** Storage free space: {} bytes ***\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            free
        );
        if let Err(e) = file.write_all(banner.as_bytes()) {
            warn!("log banner not written: {e}");
        }

        if let Err(e) = self.transfer.start(&self.user, &self.password) {
            error!("transfer service failed to start: {e}");
        }
        self.file = Some(file);
    }

    /// Append one line of text to the log.
    pub fn append(&mut self, text: &str) {
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{text}") {
                error!("log file handle lost: {e}");
                self.file = None;
            }
        }
    }

    pub fn tick(&mut self) {
        if self.file.is_some() {
            self.transfer.service();
        }
    }

    /// Close the file and release the volume.
    pub fn shutdown(&mut self) {
        self.transfer.stop();
        if let Some(file) = self.file.take() {
            if let Err(e) = file.sync_all() {
                warn!("log file not flushed: {e}");
            }
        }
        info!("log volume {} released", self.volume.display());
    }
}

fn used_bytes(volume: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(volume) else {
        return 0;
    };
    entries
        .flatten()
        .filter_map(|entry| entry.metadata().ok())
        .filter(|metadata| metadata.is_file())
        .map(|metadata| metadata.len())
        .sum()
}
