//! Conditional transfer of marketing budget between two album rows.
//!
//! The transfer reads the destination album's budget, refuses to proceed when
//! it is below the threshold, moves `amount` from the destination into the
//! source album and writes both rows in one transaction.

use std::fmt::{Display, Formatter};

use snippets_gax::cancel::CancellationToken;
use snippets_gax::retry::{invoke, RetrySetting, TryAs};
use snippets_gax::status::{Code, Status};
use spanner_lite::key::Key;
use spanner_lite::row;
use spanner_lite::value::Value;

use crate::store::TransactionalStore;

pub const TABLE: &str = "Albums";
pub const BALANCE_COLUMN: &str = "MarketingBudget";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlbumKey {
    pub singer_id: i64,
    pub album_id: i64,
}

impl AlbumKey {
    pub fn new(singer_id: i64, album_id: i64) -> Self {
        AlbumKey { singer_id, album_id }
    }

    fn key(&self) -> Key {
        Key::composite(&[&self.singer_id, &self.album_id])
    }
}

impl Display for AlbumKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.singer_id, self.album_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    /// Album credited with `amount`.
    pub source: AlbumKey,
    /// Album checked against `threshold` and debited by `amount`.
    pub destination: AlbumKey,
    pub amount: i64,
    pub threshold: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbortReason {
    InsufficientFunds,
    StoreConflict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed { source_balance: i64, destination_balance: i64 },
    Aborted(AbortReason),
}

#[derive(thiserror::Error, Debug)]
pub enum TransferError {
    #[error("row {key} not found in table {table}")]
    RowNotFound { table: String, key: AlbumKey },
    #[error("transaction conflict: {0}")]
    StoreConflict(Status),
    #[error("store unavailable: {0}")]
    StoreUnavailable(Status),
    #[error("invalid transfer request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Row(#[from] row::Error),
    #[error(transparent)]
    Store(Status),
}

impl From<Status> for TransferError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::Aborted => TransferError::StoreConflict(status),
            Code::Unavailable => TransferError::StoreUnavailable(status),
            _ => TransferError::Store(status),
        }
    }
}

// only conflicts are worth another attempt
impl TryAs<Status> for TransferError {
    fn try_as(&self) -> Option<&Status> {
        match self {
            TransferError::StoreConflict(s) => Some(s),
            _ => None,
        }
    }
}

/// Retry setting for [`run_fund_transfer`]: back off and retry on ABORTED only.
pub fn transfer_retry_setting() -> RetrySetting {
    RetrySetting {
        codes: vec![Code::Aborted],
        ..Default::default()
    }
}

/// Runs one transfer attempt inside the transaction identified by `handle`.
///
/// The handle is always consumed: committed when the transfer succeeds,
/// aborted otherwise. An `Aborted(InsufficientFunds)` outcome and every
/// error leave both rows unchanged.
pub async fn execute<S>(store: &S, mut handle: S::Handle, request: &TransferRequest) -> Result<TransactionOutcome, TransferError>
where
    S: TransactionalStore,
{
    if request.amount <= 0 {
        abort(store, handle).await;
        return Err(TransferError::InvalidRequest(format!(
            "amount must be positive: {}",
            request.amount
        )));
    }
    if request.source == request.destination {
        abort(store, handle).await;
        return Err(TransferError::InvalidRequest(format!(
            "source and destination are the same album {}",
            request.source
        )));
    }

    let destination = match read_balance(store, &mut handle, request.destination).await {
        Ok(balance) => balance,
        Err(e) => {
            abort(store, handle).await;
            return Err(e);
        }
    };
    if destination < request.threshold || destination < request.amount {
        tracing::debug!(
            "destination {} has {} which does not cover threshold {} and amount {}",
            request.destination,
            destination,
            request.threshold,
            request.amount
        );
        abort(store, handle).await;
        return Ok(TransactionOutcome::Aborted(AbortReason::InsufficientFunds));
    }

    let source = match read_balance(store, &mut handle, request.source).await {
        Ok(balance) => balance,
        Err(e) => {
            abort(store, handle).await;
            return Err(e);
        }
    };
    let destination_balance = destination - request.amount;
    let source_balance = match source.checked_add(request.amount) {
        Some(balance) => balance,
        None => {
            abort(store, handle).await;
            return Err(TransferError::InvalidRequest(format!(
                "crediting {} to {} overflows its balance",
                request.amount, request.source
            )));
        }
    };

    let rows = vec![
        row_values(request.source, source_balance),
        row_values(request.destination, destination_balance),
    ];
    if let Err(status) = store
        .write_rows(&mut handle, TABLE, &["SingerId", "AlbumId", BALANCE_COLUMN], rows)
        .await
    {
        abort(store, handle).await;
        return Err(status.into());
    }
    store.commit(handle).await?;
    Ok(TransactionOutcome::Committed {
        source_balance,
        destination_balance,
    })
}

/// Runs the transfer, beginning a fresh transaction for every attempt and
/// retrying only when the commit conflicts with a concurrent transaction.
/// Exhausted retries yield `Aborted(StoreConflict)`.
pub async fn run_fund_transfer<S>(
    store: &S,
    request: &TransferRequest,
    retry: Option<RetrySetting>,
    cancel: Option<CancellationToken>,
) -> Result<TransactionOutcome, TransferError>
where
    S: TransactionalStore,
{
    let setting = retry.unwrap_or_else(transfer_retry_setting);
    let result = invoke(cancel, Some(setting), || async {
        let handle = store.begin_transaction().await?;
        execute(store, handle, request).await
    })
    .await;
    match result {
        Err(TransferError::StoreConflict(status)) => {
            tracing::warn!("giving up transfer after repeated conflicts: {}", status);
            Ok(TransactionOutcome::Aborted(AbortReason::StoreConflict))
        }
        other => other,
    }
}

async fn read_balance<S>(store: &S, handle: &mut S::Handle, album: AlbumKey) -> Result<i64, TransferError>
where
    S: TransactionalStore,
{
    let row = store
        .read_row(handle, TABLE, album.key(), &[BALANCE_COLUMN])
        .await?
        .ok_or_else(|| TransferError::RowNotFound {
            table: TABLE.to_string(),
            key: album,
        })?;
    Ok(row.column_by_name::<i64>(BALANCE_COLUMN)?)
}

fn row_values(album: AlbumKey, balance: i64) -> Vec<Value> {
    vec![
        Value::Int64(album.singer_id),
        Value::Int64(album.album_id),
        Value::Int64(balance),
    ]
}

async fn abort<S>(store: &S, handle: S::Handle)
where
    S: TransactionalStore,
{
    if let Err(status) = store.abort(handle).await {
        tracing::debug!("abort failed: {}", status);
    }
}
