// src/app/download.rs
// Streams model files from their download url to disk, reporting progress back to the UI thread.

use crate::app::{error::DownloadError, state::UpdateMessage, store::DownloadTicket};
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use std::{
    path::{Path, PathBuf},
    sync::{atomic::Ordering, mpsc::Sender},
};
use tokio::io::AsyncWriteExt;

/// Temporary name used while the file is incomplete.
pub fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Fetches `ticket.url` into `ticket.destination`.
/// Data goes to a `.part` file first and is renamed on success; the partial
/// file is removed on cancellation or failure. Returns the byte count.
pub async fn download_model_async(
    ticket: &DownloadTicket,
    sender: Sender<UpdateMessage>,
) -> Result<u64, DownloadError> {
    let part = part_path(&ticket.destination);
    let result = fetch_to(ticket, &part, &sender).await;
    match &result {
        Ok(bytes) => {
            tokio::fs::rename(&part, &ticket.destination).await?;
            info!(
                "Downloaded '{}' ({} bytes) to '{}'.",
                ticket.model_id,
                bytes,
                ticket.destination.display()
            );
        }
        Err(e) => {
            if let Err(rm_err) = tokio::fs::remove_file(&part).await {
                if rm_err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not remove partial file '{}': {}", part.display(), rm_err);
                }
            }
            match e {
                DownloadError::Cancelled => info!("Download of '{}' cancelled.", ticket.model_id),
                other => error!("Download of '{}' failed: {}", ticket.model_id, other),
            }
        }
    }
    result
}

async fn fetch_to(
    ticket: &DownloadTicket,
    part: &Path,
    sender: &Sender<UpdateMessage>,
) -> Result<u64, DownloadError> {
    if ticket.cancel.load(Ordering::SeqCst) {
        return Err(DownloadError::Cancelled);
    }

    debug!("Sending download request to {} for '{}'", ticket.url, ticket.model_id);
    let res = reqwest::Client::new().get(&ticket.url).send().await?;
    let status = res.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            status,
            url: ticket.url.clone(),
        });
    }

    let total = res.content_length();
    let mut file = tokio::fs::File::create(part).await?;
    let mut stream = res.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_reported = 0.0f32;

    while let Some(chunk) = stream.next().await {
        if ticket.cancel.load(Ordering::SeqCst) {
            return Err(DownloadError::Cancelled);
        }
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total.filter(|t| *t > 0) {
            let fraction = (downloaded as f64 / total as f64).min(1.0) as f32;
            // Report whole-percent steps only.
            if fraction - last_reported >= 0.01 || fraction >= 1.0 {
                last_reported = fraction;
                let _ = sender.send(UpdateMessage::DownloadProgress {
                    model_id: ticket.model_id.clone(),
                    fraction,
                });
            }
        }
    }
    file.flush().await?;
    Ok(downloaded)
}
