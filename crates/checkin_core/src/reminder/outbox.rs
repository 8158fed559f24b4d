//! File outbox mail transport.
//!
//! Each message becomes one JSON file in the outbox directory, written to a
//! temporary name and renamed into place so readers never see partial files.

use crate::reminder::notifier::{MailTransport, OutgoingEmail, TransportError};
use chrono::Local;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OutboxTransport {
    dir: PathBuf,
}

impl OutboxTransport {
    /// Creates the transport, creating `dir` when missing.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MailTransport for OutboxTransport {
    fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        let stem = format!(
            "{}-{}",
            Local::now().format("%Y%m%dT%H%M%S%.3f"),
            Uuid::new_v4().simple()
        );
        let tmp_path = self.dir.join(format!(".{stem}.tmp"));
        let final_path = self.dir.join(format!("{stem}.json"));

        let payload = serde_json::to_vec_pretty(email)
            .map_err(|err| TransportError::new(format!("encode outbox message: {err}")))?;
        fs::write(&tmp_path, payload).map_err(|err| {
            TransportError::new(format!("write `{}`: {err}", tmp_path.display()))
        })?;
        fs::rename(&tmp_path, &final_path).map_err(|err| {
            let _ = fs::remove_file(&tmp_path);
            TransportError::new(format!("publish `{}`: {err}", final_path.display()))
        })?;

        info!(
            "event=outbox_write module=reminder status=ok file={}",
            final_path.display()
        );
        Ok(())
    }
}
