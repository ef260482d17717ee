//! Checkout adapter shelling out to external git tooling.
//!
//! The worker never performs version-control operations itself; it runs the
//! site's checkout script and relays its line output. A `CONFLICT` marker
//! anywhere in the output flags the outcome, it does not abort the run.

use async_trait::async_trait;
use gantry_core::ports::{CheckoutOutcome, CheckoutRequest, CheckoutService};
use gantry_core::work::LogLine;
use gantry_core::{Error, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Turn a ref URL into a filesystem-safe directory component.
pub fn safe_refurl(refurl: &str) -> String {
    refurl
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub struct GitCheckout {
    tools_dir: PathBuf,
    checkout_root: PathBuf,
}

impl GitCheckout {
    pub fn new(tools_dir: impl Into<PathBuf>, checkout_root: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: tools_dir.into(),
            checkout_root: checkout_root.into(),
        }
    }

    fn destination(&self, request: &CheckoutRequest) -> PathBuf {
        self.checkout_root.join(&request.project).join(format!(
            "{}_{}",
            request.project,
            safe_refurl(&request.refurl)
        ))
    }
}

fn stream_lines(
    reader: impl AsyncRead + Unpin + Send + 'static,
    tx: mpsc::Sender<LogLine>,
    conflict: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.contains("CONFLICT") {
                conflict.store(true, Ordering::Relaxed);
            }
            if tx.send(LogLine::now(line)).await.is_err() {
                break;
            }
        }
    })
}

#[async_trait]
impl CheckoutService for GitCheckout {
    async fn checkout(
        &self,
        request: &CheckoutRequest,
        output: mpsc::Sender<LogLine>,
    ) -> Result<CheckoutOutcome> {
        let script = self.tools_dir.join("gitcheckout.sh");
        let destination = self.destination(request);

        info!(
            project = %request.project,
            refurl = %request.refurl,
            rewind = request.rewind,
            "Running checkout tooling"
        );

        let mut command = Command::new("sh");
        command
            .arg(&script)
            .arg(&request.project)
            .arg(&request.refurl)
            .arg(&destination)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if request.rewind {
            command.arg("--rewind");
        }

        let mut child = command
            .spawn()
            .map_err(|e| Error::Checkout(format!("failed to spawn {}: {}", script.display(), e)))?;

        let conflict = Arc::new(AtomicBool::new(false));
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Checkout("no stdout handle".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Checkout("no stderr handle".to_string()))?;

        let stdout_handle = stream_lines(stdout, output.clone(), conflict.clone());
        let stderr_handle = stream_lines(stderr, output, conflict.clone());

        let status = child
            .wait()
            .await
            .map_err(|e| Error::Checkout(format!("failed to wait for checkout: {}", e)))?;

        let _ = stdout_handle.await;
        let _ = stderr_handle.await;

        if !status.success() {
            return Err(Error::Checkout(format!(
                "checkout tooling exited with {}",
                status.code().unwrap_or(-1)
            )));
        }

        let conflict = conflict.load(Ordering::Relaxed);
        debug!(destination = %destination.display(), conflict, "Checkout finished");

        Ok(CheckoutOutcome {
            path: destination,
            conflict,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_refurl() {
        assert_eq!(safe_refurl("refs/changes/12345/2"), "refs_changes_12345_2");
    }

    #[test]
    fn test_destination_layout() {
        let checkout = GitCheckout::new("/srv/ci-tools", "/srv/git-checkouts");
        let request = CheckoutRequest {
            project: "nova".to_string(),
            refurl: "refs/changes/12345/2".to_string(),
            rewind: false,
        };
        assert_eq!(
            checkout.destination(&request),
            PathBuf::from("/srv/git-checkouts/nova/nova_refs_changes_12345_2")
        );
    }
}
