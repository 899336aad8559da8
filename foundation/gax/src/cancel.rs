use tokio_util::sync::CancellationToken as Inner;

/// Handle for abandoning an in-flight store call.
///
/// Clones share state: cancelling any clone cancels them all. Calls that see
/// the cancellation fail with [`Code::Cancelled`](crate::status::Code::Cancelled)
/// and drop whatever transaction they were holding.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Inner,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_cancellation() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
        other.cancelled().await;
    }
}
