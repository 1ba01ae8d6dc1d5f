//! Ready gate: park callers until an asynchronously initialised value exists.

use anyhow::{Result, anyhow};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

pub type SharedError = Arc<anyhow::Error>;

#[derive(Clone)]
enum GateState<T> {
    Pending,
    Ready(T),
    Failed(SharedError),
}

/// Handed to every caller of a gate whose initialisation failed. The original
/// error is kept as the source, so its whole chain stays reachable.
#[derive(Debug, Clone)]
pub struct InitFailed(pub SharedError);

impl fmt::Display for InitFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("backend initialisation failed")
    }
}

impl std::error::Error for InitFailed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&**self.0)
    }
}

/// Hands out clones of `T` once initialisation finished. Calls made before
/// that wait instead of failing; a failed initialisation is reported to every
/// waiter and every later caller.
#[derive(Clone)]
pub struct ReadyGate<T> {
    rx: watch::Receiver<GateState<T>>,
}

impl<T> ReadyGate<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn ready(value: T) -> Self {
        let (_tx, rx) = watch::channel(GateState::Ready(value));
        Self { rx }
    }

    /// Run `init` on the current runtime and open the gate when it resolves.
    pub fn spawn<F>(init: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(GateState::Pending);
        tokio::spawn(async move {
            let state = match init.await {
                Ok(value) => {
                    info!("backend ready");
                    GateState::Ready(value)
                }
                Err(e) => {
                    error!("backend initialisation failed: {e:#}");
                    GateState::Failed(Arc::new(e))
                }
            };
            let _ = tx.send(state);
        });
        Self { rx }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.rx.borrow(), GateState::Ready(_))
    }

    pub async fn get(&self) -> Result<T> {
        let mut rx = self.rx.clone();
        let state = rx
            .wait_for(|s| !matches!(s, GateState::Pending))
            .await
            .map_err(|_| anyhow!("backend initialisation was aborted"))?;
        match &*state {
            GateState::Ready(value) => Ok(value.clone()),
            GateState::Failed(err) => Err(InitFailed(Arc::clone(err)).into()),
            GateState::Pending => Err(anyhow!("backend not ready")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_ready_immediately() {
        let gate = ReadyGate::ready(7u32);
        assert!(gate.is_ready());
        assert_eq!(gate.get().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_waiters_park_until_init_completes() {
        let (tx, rx) = oneshot::channel::<u32>();
        let gate = ReadyGate::spawn(async move { Ok(rx.await?) });

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.get().await })
        };
        tokio::task::yield_now().await;
        assert!(!gate.is_ready());

        tx.send(42).unwrap();
        assert_eq!(waiter.await.unwrap().unwrap(), 42);
        assert!(gate.is_ready());
    }

    #[tokio::test]
    async fn test_failed_init_is_reported() {
        let gate: ReadyGate<u32> = ReadyGate::spawn(async { Err(anyhow!("disk gone")) });
        let err = gate.get().await.unwrap_err();
        assert!(format!("{err:#}").contains("disk gone"));
        // and stays failed
        assert!(gate.get().await.is_err());
    }

    #[tokio::test]
    async fn test_failure_keeps_error_chain() {
        let gate: ReadyGate<u32> = ReadyGate::spawn(async {
            let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no access");
            Err(anyhow::Error::new(io).context("open /data"))
        });
        let err = gate.get().await.unwrap_err();

        let messages: Vec<String> = err.chain().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            vec!["backend initialisation failed", "open /data", "no access"]
        );
        assert!(err.downcast_ref::<InitFailed>().is_some());
        let io = err
            .chain()
            .find_map(|e| e.downcast_ref::<std::io::Error>())
            .unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::PermissionDenied);
    }
}
