use std::iter::Take;
use std::marker::PhantomData;

use snippets_gax::retry::{CodePredicate, ExponentialBackoff, Predicate, Retry, RetrySetting, TryAs};
use snippets_gax::status::{Code, Status};

pub struct TransactionPredicate<E>
where
    E: TryAs<Status>,
{
    inner: CodePredicate,
    _marker: PhantomData<E>,
}

impl<E> Predicate<E> for TransactionPredicate<E>
where
    E: TryAs<Status>,
{
    fn should_retry(&mut self, error: &E) -> bool {
        let status = match error.try_as() {
            Some(s) => s,
            None => return false,
        };
        // a closed client never comes back
        if status.code() == Code::Unavailable && status.message().contains("client closed") {
            return false;
        }
        self.inner.should_retry(error)
    }
}

/// Retry setting for transactions, retrying ABORTED commits by default.
#[derive(Clone, Debug)]
pub struct TransactionRetrySetting {
    pub inner: RetrySetting,
}

impl<E> Retry<E, TransactionPredicate<E>> for TransactionRetrySetting
where
    E: TryAs<Status>,
{
    fn strategy(&self) -> Take<ExponentialBackoff> {
        <RetrySetting as Retry<E, CodePredicate>>::strategy(&self.inner)
    }

    fn predicate(&self) -> TransactionPredicate<E> {
        TransactionPredicate {
            inner: CodePredicate::new(self.inner.codes.clone()),
            _marker: PhantomData,
        }
    }
}

impl TransactionRetrySetting {
    pub fn new(codes: Vec<Code>) -> Self {
        let inner = RetrySetting {
            codes,
            ..Default::default()
        };
        Self { inner }
    }
}

impl Default for TransactionRetrySetting {
    fn default() -> Self {
        TransactionRetrySetting::new(vec![Code::Aborted])
    }
}

#[cfg(test)]
mod tests {
    use snippets_gax::retry::{Predicate, Retry};
    use snippets_gax::status::Status;

    use crate::client::TxError;
    use crate::retry::TransactionRetrySetting;

    #[test]
    fn test_transaction_predicate() {
        let default = TransactionRetrySetting::default();
        let mut predicate = <TransactionRetrySetting as Retry<TxError, _>>::predicate(&default);
        assert!(predicate.should_retry(&TxError::GRPC(Status::aborted("conflict"))));
        assert!(!predicate.should_retry(&TxError::GRPC(Status::not_found("missing"))));
        assert!(!predicate.should_retry(&TxError::GRPC(Status::unavailable("client closed"))));
    }
}
