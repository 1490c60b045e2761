//! A single-worker job queue for the one kind of work a connection or
//! scheduler task must never block itself on: a network call to a
//! third party (spec §9 hublist registration). Modelled after the
//! background-task spawn pattern used throughout the hub (one
//! `tokio::spawn`, an mpsc inbox), but jobs here are data, not closures,
//! so the worker never needs a handle back into live hub state.

use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

const JOB_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub enum Job {
    /// Announce this hub to an external hublist over a plain TCP POST
    /// (spec §9 "hublist registration is fire-and-forget"). `target` is
    /// `host:port`; `body` is the pre-built announce payload.
    AnnounceHublist { target: String, body: String },
}

#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Job>,
}

impl WorkerHandle {
    /// Spawn the worker task. The inbox is small and lossy by design: if
    /// the scheduler enqueues faster than the worker drains (it never
    /// should, given the hublist cadence is minutes), `submit` just
    /// drops the newest job rather than let the queue grow unbounded.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(8);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                run_job(job).await;
            }
        });
        WorkerHandle { tx }
    }

    pub async fn submit(&self, job: Job) {
        if self.tx.try_send(job).is_err() {
            tracing::warn!("worker queue full, dropping job");
        }
    }
}

async fn run_job(job: Job) {
    match job {
        Job::AnnounceHublist { target, body } => {
            if let Err(err) = tokio::time::timeout(JOB_TIMEOUT, announce(&target, &body)).await {
                tracing::warn!(%target, %err, "hublist announce timed out");
            }
        }
    }
}

async fn announce(target: &str, body: &str) -> std::io::Result<()> {
    let mut stream = TcpStream::connect(target).await?;
    let request = format!(
        "POST / HTTP/1.0\r\nContent-Length: {}\r\nContent-Type: text/plain\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;
    tracing::debug!(%target, "hublist announce sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn announce_writes_expected_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            socket.read_to_end(&mut buf).await.ok();
            buf
        });

        announce(&addr.to_string(), "nmdc://hub.example:411 TestHub 0/100").await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), server).await.unwrap().unwrap();
        let text = String::from_utf8(received).unwrap();
        assert!(text.contains("nmdc://hub.example:411"));
    }
}
