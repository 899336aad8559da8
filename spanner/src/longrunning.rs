use std::time::Duration;

use snippets_gax::cancel::CancellationToken;
use snippets_gax::retry::{invoke_fn, RetrySetting};
use snippets_gax::status::{Code, Status};
use tokio::task::JoinHandle;

/// Operation tracks a schema change or database creation running in the background.
#[derive(Debug)]
pub struct Operation<T> {
    name: String,
    handle: Option<JoinHandle<Result<T, Status>>>,
    result: Option<Result<T, Status>>,
}

impl<T> Operation<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn spawn<F>(name: String, task: F) -> Self
    where
        F: FnOnce() -> Result<T, Status> + Send + 'static,
    {
        Self {
            name,
            handle: Some(tokio::spawn(async move { task() })),
            result: None,
        }
    }

    /// Name returns the name of the long-running operation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Done reports whether the long-running operation has completed.
    pub fn done(&self) -> bool {
        self.result.is_some()
    }

    /// Poll fetches the latest state of a long-running operation.
    ///
    /// If the operation has completed with failure, the error is returned and
    /// done will return true. If it has completed successfully the response is
    /// returned. Otherwise the result is None.
    pub async fn poll(&mut self) -> Result<Option<T>, Status> {
        if self.result.is_none() && self.handle.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = self.handle.take() {
                tracing::trace!("operation {} finished", self.name);
                self.result = Some(match handle.await {
                    Ok(result) => result,
                    Err(e) if e.is_cancelled() => Err(Status::cancelled(format!("operation {} cancelled", self.name))),
                    Err(e) => Err(Status::new(Code::Internal, e.to_string())),
                });
            }
        }
        match &self.result {
            None => Ok(None),
            Some(Ok(v)) => Ok(Some(v.clone())),
            Some(Err(e)) => Err(e.clone()),
        }
    }

    /// wait polls until the operation completes, backing off between polls.
    pub async fn wait(&mut self, cancel: Option<CancellationToken>, option: Option<RetrySetting>) -> Result<Option<T>, Status> {
        let settings = option.unwrap_or_else(|| RetrySetting {
            from_millis: 1,
            max_delay: Some(Duration::from_millis(100)),
            factor: 2,
            take: 100,
            codes: vec![Code::DeadlineExceeded],
        });
        invoke_fn(
            cancel,
            Some(settings),
            |me| async move {
                let poll_result: Option<T> = match me.poll().await {
                    Ok(s) => s,
                    Err(e) => return Err((e, me)),
                };
                if me.done() {
                    Ok(poll_result)
                } else {
                    Err((Status::new(Code::DeadlineExceeded, "wait timeout"), me))
                }
            },
            self,
        )
        .await
    }

    /// Cancel stops the operation if it has not completed yet. A cancelled
    /// operation reports done and poll returns an error with code Cancelled.
    pub async fn cancel(&mut self) -> Result<(), Status> {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            self.result = Some(match handle.await {
                Ok(result) => result,
                Err(_) => Err(Status::cancelled(format!("operation {} cancelled", self.name))),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait() {
        let mut op = Operation::spawn("operations/1".to_string(), || Ok(42));
        assert_eq!(op.name(), "operations/1");
        assert_eq!(op.wait(None, None).await.unwrap(), Some(42));
        assert!(op.done());
        assert_eq!(op.poll().await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_wait_failure() {
        let mut op: Operation<()> = Operation::spawn("operations/2".to_string(), || Err(Status::not_found("missing")));
        let err = op.wait(None, None).await.unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
        assert!(op.done());
    }

    #[tokio::test]
    async fn test_cancel_after_completion_keeps_result() {
        let mut op = Operation::spawn("operations/3".to_string(), || Ok("done"));
        op.wait(None, None).await.unwrap();
        op.cancel().await.unwrap();
        assert_eq!(op.poll().await.unwrap(), Some("done"));
    }
}
