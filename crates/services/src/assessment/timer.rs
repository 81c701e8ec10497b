use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// One-shot countdown that runs a callback when it reaches zero.
///
/// Dropping the timer does not stop it; call `cancel`.
#[derive(Debug)]
pub struct ExamTimer {
    handle: JoinHandle<()>,
}

impl ExamTimer {
    /// Run `on_expiry` after `after` has elapsed on the tokio clock.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(after: Duration, on_expiry: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            on_expiry.await;
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn flagged(after: Duration) -> (ExamTimer, Arc<AtomicBool>) {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let timer = ExamTimer::spawn(after, async move {
            flag.store(true, Ordering::SeqCst);
        });
        (timer, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_the_countdown_elapses() {
        let (timer, fired) = flagged(Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (timer, fired) = flagged(Duration::from_secs(60));
        timer.cancel();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(timer.is_finished());
    }
}
