use std::sync::{Arc, Mutex, PoisonError};

use patente_core::model::{ExamAttempt, QuestionProgress};
use storage::repository::{ProgressRepository, StorageError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Append-only writer for answer history and attempts.
///
/// `record` spawns the write and returns immediately; a failed write is
/// logged and dropped. `flush` waits for every write spawned so far.
#[derive(Clone)]
pub struct ProgressRecorder {
    progress: Arc<dyn ProgressRepository>,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl ProgressRecorder {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>) -> Self {
        Self {
            progress,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fire-and-forget write of one answer record.
    ///
    /// Must be called from within a tokio runtime.
    pub fn record(&self, record: QuestionProgress) {
        let progress = Arc::clone(&self.progress);
        let handle = tokio::spawn(async move {
            if let Err(err) = progress.append_question_progress(&record).await {
                warn!(
                    user_id = %record.user_id,
                    question_id = %record.question_id,
                    error = %err,
                    "failed to record answer"
                );
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Write one answer record and wait for it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    pub async fn record_now(&self, record: &QuestionProgress) -> Result<(), StorageError> {
        self.progress.append_question_progress(record).await?;
        debug!(user_id = %record.user_id, question_id = %record.question_id, "answer recorded");
        Ok(())
    }

    /// Write every record of a finished session, one per question.
    ///
    /// Individual failures are logged; the rest of the batch is still written.
    /// Returns how many records were stored.
    pub async fn record_session_result(&self, records: &[QuestionProgress]) -> usize {
        let mut stored = 0;
        for record in records {
            match self.record_now(record).await {
                Ok(()) => stored += 1,
                Err(err) => warn!(
                    user_id = %record.user_id,
                    question_id = %record.question_id,
                    error = %err,
                    "failed to record session answer"
                ),
            }
        }
        stored
    }

    /// Append the summary of a finished session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    pub async fn record_attempt(&self, attempt: &ExamAttempt) -> Result<(), StorageError> {
        self.progress.append_attempt(attempt).await
    }

    /// Wait for all spawned writes to settle.
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.drain(..).collect()
        };
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "answer write task did not complete");
            }
        }
    }
}
