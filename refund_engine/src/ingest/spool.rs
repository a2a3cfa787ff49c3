use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    time::Duration,
};

use log::*;
use tokio::{sync::Mutex, time::Instant};

use super::{Delivery, QueueError, Subscription};

#[derive(Default)]
struct SpoolState {
    in_flight: HashSet<String>,
    deferred: HashMap<String, Instant>,
    attempts: HashMap<String, u32>,
}

/// A file-backed subscription. Every `*.json` file in the spool directory is one message, delivered in file name
/// order. Acking deletes the file. Nacking leaves the file in place and hides it until the redelivery delay has
/// passed.
///
/// Delivery bookkeeping lives in memory, so a restart redelivers every file that is still in the directory.
pub struct SpoolSubscription {
    dir: PathBuf,
    redelivery_delay: Duration,
    state: Mutex<SpoolState>,
}

impl SpoolSubscription {
    /// Opens the spool at `dir`, creating the directory if it does not exist yet.
    pub async fn open<P: AsRef<Path>>(dir: P, redelivery_delay: Duration) -> Result<Self, QueueError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        debug!("📥️ Spool subscription reading from {}", dir.display());
        Ok(Self { dir, redelivery_delay, state: Mutex::new(SpoolState::default()) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn spooled_files(&self) -> Result<Vec<String>, QueueError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            if !is_json || !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl Subscription for SpoolSubscription {
    async fn pull(&self, max: usize) -> Result<Vec<Delivery>, QueueError> {
        let names = self.spooled_files().await?;
        let mut state = self.state.lock().await;
        let now = Instant::now();
        state.deferred.retain(|_, visible_at| *visible_at > now);
        let mut result = Vec::new();
        for name in names {
            if result.len() >= max {
                break;
            }
            if state.in_flight.contains(&name) || state.deferred.contains_key(&name) {
                continue;
            }
            let payload = match tokio::fs::read(self.dir.join(&name)).await {
                Ok(payload) => payload,
                // Another consumer got there first
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let attempt = {
                let n = state.attempts.entry(name.clone()).or_insert(0);
                *n += 1;
                *n
            };
            state.in_flight.insert(name.clone());
            result.push(Delivery { id: name, payload, attempt });
        }
        Ok(result)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if !state.in_flight.remove(&delivery.id) {
            return Err(QueueError::UnknownDelivery(delivery.id.clone()));
        }
        state.attempts.remove(&delivery.id);
        match tokio::fs::remove_file(self.dir.join(&delivery.id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn nack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if !state.in_flight.remove(&delivery.id) {
            return Err(QueueError::UnknownDelivery(delivery.id.clone()));
        }
        let visible_at = Instant::now() + self.redelivery_delay;
        state.deferred.insert(delivery.id.clone(), visible_at);
        Ok(())
    }
}
