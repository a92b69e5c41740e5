// Upload flow: size gate, multipart upload with a progress bar, share link,
// all wrapped in the retry policy.

use crate::api::LanzouClient;
use crate::error::{LanzouError, Result};
use crate::retry::{RetryOutcome, RetryPolicy};
use crate::transport::Transport;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Largest file a free account may upload (100 MiB).
pub const MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

/// Shown after the last attempt fails.
pub const FAILURE_CAUSES: [&str; 3] = [
    "unstable network connection",
    "abnormal server response",
    "unsupported file type",
];

/// Ensure `path` is an existing file no larger than [`MAX_UPLOAD_SIZE`].
/// Returns its size.
pub fn check_upload_size(path: &Path) -> Result<u64> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(LanzouError::LocalFileMissing(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LanzouError::LocalFileMissing(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    let size = metadata.len();
    if size > MAX_UPLOAD_SIZE {
        return Err(LanzouError::FileTooLarge {
            size,
            limit: MAX_UPLOAD_SIZE,
        });
    }
    Ok(size)
}

/// Byte progress bar for one upload attempt.
pub fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} uploading [{bar:40.cyan/blue}] {bytes}/{total_bytes} @ {bytes_per_sec}",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

fn hidden_bar(len: u64) -> ProgressBar {
    ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::hidden())
}

/// Knobs for [`upload_with_retry`].
#[derive(Debug, Clone, Copy)]
pub struct UploadOptions {
    pub retry: RetryPolicy,
    pub show_progress: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            show_progress: true,
        }
    }
}

/// Upload `path` into `folder_id` and return its share link.
///
/// The size gate and login check run before any request. Each attempt is a
/// full upload plus share-link request; `sleep` is called between attempts.
pub fn upload_with_retry<T, S>(
    client: &LanzouClient<T>,
    path: &Path,
    folder_id: &str,
    options: UploadOptions,
    sleep: S,
) -> Result<String>
where
    T: Transport,
    S: FnMut(Duration),
{
    let size = check_upload_size(path)?;
    client.ensure_logged_in()?;
    info!(path = %path.display(), size, folder_id, "starting upload");

    let outcome = options.retry.run(
        |attempt| {
            info!(attempt, "upload attempt");
            let bar = if options.show_progress {
                progress_bar(size)
            } else {
                hidden_bar(size)
            };
            let result = client.upload_file(path, folder_id, &bar);
            bar.finish_and_clear();
            result
        },
        sleep,
    );

    match outcome {
        RetryOutcome::Succeeded { value, .. } => Ok(value),
        RetryOutcome::Exhausted {
            attempts,
            last_error,
        } => Err(LanzouError::UploadFailed {
            attempts,
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no share link returned".to_string()),
        }),
    }
}
