//! Request dispatcher.
//!
//! One FLU instance is a single-owner actor: all operations are processed
//! sequentially, in arrival order, by a dedicated task that owns the
//! [`FluState`]. Clients hold a cloneable [`Flu`] handle and submit
//! requests over a bounded channel; each request carries a oneshot sender
//! for its reply.
//!
//! An operation runs to completion (including any required hard-state
//! flush) before the next begins, so for any two operations on the same
//! LPN the later-serialized one observes the former's effect, and every
//! operation serialized after a successful seal sees the raised fence.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use flulog_common::types::{Epoch, Lpn};

use crate::config::FluConfig;
use crate::error::{FluError, FluResult};
use crate::flu::FluState;
use crate::ops::{FillReply, FluStatus, ReadReply, SealReply, TrimReply, WriteReply};

/// A request to the owner task, with its reply channel.
enum Request {
    Write {
        epoch: Epoch,
        lpn: Lpn,
        payload: Bytes,
        reply: oneshot::Sender<FluResult<WriteReply>>,
    },
    Read {
        epoch: Epoch,
        lpn: Lpn,
        reply: oneshot::Sender<FluResult<ReadReply>>,
    },
    Trim {
        epoch: Epoch,
        lpn: Lpn,
        reply: oneshot::Sender<FluResult<TrimReply>>,
    },
    Fill {
        epoch: Epoch,
        lpn: Lpn,
        reply: oneshot::Sender<FluResult<FillReply>>,
    },
    Seal {
        epoch: Epoch,
        reply: oneshot::Sender<FluResult<SealReply>>,
    },
    Status {
        reply: oneshot::Sender<FluStatus>,
    },
    Stop {
        reply: oneshot::Sender<FluResult<()>>,
    },
}

/// Handle to a running FLU.
///
/// Cheap to clone; all clones feed the same single-owner task. Once the
/// node stops (gracefully or on a fatal error), every method returns
/// [`FluError::Stopped`].
#[derive(Clone)]
pub struct Flu {
    tx: mpsc::Sender<Request>,
}

impl Flu {
    /// Opens the node and starts serving requests.
    ///
    /// Hard-state load, memfile open, and the recovery scan all complete
    /// before this returns; the handle never observes a half-initialized
    /// node.
    pub async fn spawn(config: FluConfig) -> FluResult<Self> {
        let state = FluState::open(config).await?;
        let (tx, rx) = mpsc::channel(state.config().queue_depth);

        tokio::spawn(run(state, rx));

        Ok(Self { tx })
    }

    /// Writes `page` at `lpn`.
    pub async fn write(&self, epoch: Epoch, lpn: Lpn, page: Bytes) -> FluResult<WriteReply> {
        self.request(|reply| Request::Write {
            epoch,
            lpn,
            payload: page,
            reply,
        })
        .await?
    }

    /// Reads the page at `lpn`.
    pub async fn read(&self, epoch: Epoch, lpn: Lpn) -> FluResult<ReadReply> {
        self.request(|reply| Request::Read { epoch, lpn, reply }).await?
    }

    /// Trims the written page at `lpn`.
    pub async fn trim(&self, epoch: Epoch, lpn: Lpn) -> FluResult<TrimReply> {
        self.request(|reply| Request::Trim { epoch, lpn, reply }).await?
    }

    /// Hole-fills the unwritten page at `lpn`.
    pub async fn fill(&self, epoch: Epoch, lpn: Lpn) -> FluResult<FillReply> {
        self.request(|reply| Request::Fill { epoch, lpn, reply }).await?
    }

    /// Seals the node at `epoch`.
    pub async fn seal(&self, epoch: Epoch) -> FluResult<SealReply> {
        self.request(|reply| Request::Seal { epoch, reply }).await?
    }

    /// Returns a snapshot of the node's observable state.
    pub async fn status(&self) -> FluResult<FluStatus> {
        self.request(|reply| Request::Status { reply }).await
    }

    /// Gracefully stops the node, flushing the hard state.
    ///
    /// Requests already queued ahead of the stop are served first.
    pub async fn stop(&self) -> FluResult<()> {
        self.request(|reply| Request::Stop { reply }).await?
    }

    /// Sends one request and awaits its reply.
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> FluResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| FluError::Stopped)?;
        rx.await.map_err(|_| FluError::Stopped)
    }
}

impl std::fmt::Debug for Flu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flu").finish_non_exhaustive()
    }
}

/// The owner loop: drains requests in FIFO order until a stop request, a
/// fatal error, or the last handle drops.
async fn run(mut state: FluState, mut rx: mpsc::Receiver<Request>) {
    let mut stopped = false;

    while let Some(request) = rx.recv().await {
        if serve(&mut state, request).await {
            stopped = true;
            break;
        }
    }

    if !stopped {
        // All handles dropped without an explicit stop; flush what we can.
        if let Err(error) = state.stop().await {
            warn!(%error, "hard-state flush on implicit shutdown failed");
        }
    }
}

/// Serves one request. Returns true if the loop must halt.
async fn serve(state: &mut FluState, request: Request) -> bool {
    match request {
        Request::Write {
            epoch,
            lpn,
            payload,
            reply,
        } => {
            let result = state.write(epoch, lpn, payload).await;
            finish(result, reply)
        }
        Request::Read { epoch, lpn, reply } => {
            let result = state.read(epoch, lpn).await;
            finish(result, reply)
        }
        Request::Trim { epoch, lpn, reply } => {
            let result = state.trim(epoch, lpn).await;
            finish(result, reply)
        }
        Request::Fill { epoch, lpn, reply } => {
            let result = state.fill(epoch, lpn).await;
            finish(result, reply)
        }
        Request::Seal { epoch, reply } => {
            let result = state.seal(epoch).await;
            finish(result, reply)
        }
        Request::Status { reply } => {
            let _ = reply.send(state.status());
            false
        }
        Request::Stop { reply } => {
            let result = state.stop().await;
            if let Err(error) = &result {
                warn!(%error, "flush during stop failed");
            }
            let _ = reply.send(result);
            true
        }
    }
}

/// Delivers a reply and reports whether the error (if any) must halt the
/// node.
fn finish<T>(result: FluResult<T>, reply: oneshot::Sender<FluResult<T>>) -> bool {
    let halt = result.as_ref().err().is_some_and(FluError::is_fatal);
    let _ = reply.send(result);
    halt
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(dir: &std::path::Path) -> FluConfig {
        FluConfig::new(dir).with_page_size(8).with_max_mem(64 * 1024)
    }

    fn page(bytes: &'static [u8; 8]) -> Bytes {
        Bytes::from_static(bytes)
    }

    #[tokio::test]
    async fn test_spawn_and_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let flu = Flu::spawn(test_config(tmp.path())).await.unwrap();

        let epoch = Epoch::new(1);
        assert_eq!(
            flu.write(epoch, Lpn::new(1), page(b"ABCDEFGH")).await.unwrap(),
            WriteReply::Written
        );
        assert_eq!(
            flu.read(epoch, Lpn::new(1)).await.unwrap(),
            ReadReply::Page(Bytes::from_static(b"ABCDEFGH"))
        );

        flu.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_rejects_later_requests() {
        let tmp = TempDir::new().unwrap();
        let flu = Flu::spawn(test_config(tmp.path())).await.unwrap();

        flu.stop().await.unwrap();

        let result = flu.status().await;
        assert!(matches!(result, Err(FluError::Stopped)));

        let result = flu.write(Epoch::new(1), Lpn::new(1), page(b"ABCDEFGH")).await;
        assert!(matches!(result, Err(FluError::Stopped)));
    }

    #[tokio::test]
    async fn test_concurrent_writers_single_winner() {
        let tmp = TempDir::new().unwrap();
        let flu = Flu::spawn(test_config(tmp.path())).await.unwrap();

        // Many clients race to write the same LPN; the owner serializes
        // them, so exactly one wins.
        let mut handles = Vec::new();
        for i in 0..16u8 {
            let flu = flu.clone();
            handles.push(tokio::spawn(async move {
                let payload = Bytes::from(vec![i; 8]);
                flu.write(Epoch::new(1), Lpn::new(1), payload).await.unwrap()
            }));
        }

        let mut written = 0;
        let mut overwritten = 0;
        for handle in handles {
            match handle.await.unwrap() {
                WriteReply::Written => written += 1,
                WriteReply::Overwritten => overwritten += 1,
                other => panic!("unexpected reply: {:?}", other),
            }
        }
        assert_eq!(written, 1);
        assert_eq!(overwritten, 15);

        flu.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_distinct_lpns_all_land() {
        let tmp = TempDir::new().unwrap();
        let flu = Flu::spawn(test_config(tmp.path())).await.unwrap();

        let mut handles = Vec::new();
        for n in 1..=32u64 {
            let flu = flu.clone();
            handles.push(tokio::spawn(async move {
                let payload = Bytes::from(n.to_be_bytes().to_vec());
                flu.write(Epoch::new(1), Lpn::new(n), payload).await.unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), WriteReply::Written);
        }

        let status = flu.status().await.unwrap();
        assert_eq!(status.max_logical_page, Lpn::new(32));

        for n in 1..=32u64 {
            let reply = flu.read(Epoch::new(1), Lpn::new(n)).await.unwrap();
            assert_eq!(reply, ReadReply::Page(Bytes::from(n.to_be_bytes().to_vec())));
        }

        flu.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_seal_through_handle() {
        let tmp = TempDir::new().unwrap();
        let flu = Flu::spawn(test_config(tmp.path())).await.unwrap();

        flu.write(Epoch::new(1), Lpn::new(2), page(b"22222222"))
            .await
            .unwrap();

        assert_eq!(
            flu.seal(Epoch::new(1)).await.unwrap(),
            SealReply::Sealed(Lpn::new(2))
        );
        assert_eq!(
            flu.fill(Epoch::new(1), Lpn::new(3)).await.unwrap(),
            FillReply::BadEpoch
        );
        assert_eq!(
            flu.trim(Epoch::new(2), Lpn::new(2)).await.unwrap(),
            TrimReply::Done
        );

        flu.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_status_snapshot() {
        let tmp = TempDir::new().unwrap();
        let flu = Flu::spawn(test_config(tmp.path())).await.unwrap();

        let status = flu.status().await.unwrap();
        assert_eq!(status.min_epoch, Epoch::ZERO);
        assert_eq!(status.page_size, 8);
        assert_eq!(status.max_mem, 64 * 1024);
        assert_eq!(status.max_logical_page, Lpn::INVALID);
        assert_eq!(status.trim_watermark, Lpn::INVALID);

        flu.stop().await.unwrap();
    }
}
