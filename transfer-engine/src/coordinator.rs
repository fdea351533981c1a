//! Transfer Coordinator
//!
//! Orchestrates validation, ordered account acquisition, debit/credit,
//! record lifecycle and failure recovery. Contains NO infrastructure
//! logic - pure orchestration over the store ports.
//!
//! Correctness devices, in order of appearance:
//! - the PENDING record is persisted before any balance mutation
//!   (write-ahead of intent), keyed by the idempotency id;
//! - the account versions a commit is about to stamp are written onto
//!   the record before the first CAS, so a re-driver of a PENDING record
//!   can tell which legs of a crashed attempt already landed and never
//!   applies them twice;
//! - both accounts are acquired in the total order of `AccountNumber`,
//!   independent of debit/credit role, so two opposite-direction
//!   transfers over the same pair cannot deadlock;
//! - per-account compare-and-swap is the only mutation primitive; the
//!   loser of a race reloads and retries with jittered backoff instead
//!   of blocking;
//! - the commit phase runs in a spawned task, so a caller dropping the
//!   future cannot strand a half-committed transfer.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use transfer_types::{
    Account, AccountStatus, AccountStore, AppliedVersions, DomainError, FailureReason, IdGenerator,
    InsertOutcome, StoreError, TransferCommand, TransferId, TransferOutcome, TransferRecord,
    TransferStatus, TransferStore,
};

/// Errors surfaced to the caller instead of a terminal outcome.
///
/// Everything else - domain rule violations, exhausted retries - is not an
/// error at this boundary: it is an `Ok(TransferOutcome)` with FAILED
/// status and a reason.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Rejected before any record was written; never retried automatically.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// Infrastructure failure; the record (if any) is still PENDING, so a
    /// retry with the same transfer id is safe and idempotent.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Tunables for a coordinator instance.
#[derive(Debug, Clone)]
pub struct TransferPolicy {
    /// CAS retry budget before giving up with CONCURRENT_MODIFICATION.
    pub max_attempts: u32,
    /// Linear backoff base between CAS retries.
    pub backoff_base: Duration,
    /// Upper bound of the random jitter added to each backoff.
    pub backoff_jitter: Duration,
    /// Whether a STOPPED (not CLOSED) account may receive a credit.
    pub allow_credit_to_stopped: bool,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(5),
            backoff_jitter: Duration::from_millis(5),
            allow_credit_to_stopped: false,
        }
    }
}

/// Default id source: random v4 UUIDs.
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next(&self) -> TransferId {
        TransferId::new()
    }
}

/// Application service coordinating a single funds transfer.
///
/// Generic over the store ports - adapters are injected at compile time.
/// The stores are held behind `Arc` because the commit phase is handed to
/// a spawned task that must outlive a cancelled caller.
pub struct TransferCoordinator<A, T, G = UuidIdGenerator>
where
    A: AccountStore,
    T: TransferStore,
    G: IdGenerator,
{
    accounts: Arc<A>,
    transfers: Arc<T>,
    ids: G,
    policy: TransferPolicy,
}

impl<A, T> TransferCoordinator<A, T, UuidIdGenerator>
where
    A: AccountStore,
    T: TransferStore,
{
    /// Creates a coordinator with the default policy and UUID ids.
    pub fn new(accounts: Arc<A>, transfers: Arc<T>) -> Self {
        Self::with_generator(accounts, transfers, UuidIdGenerator)
    }
}

impl<A, T, G> TransferCoordinator<A, T, G>
where
    A: AccountStore,
    T: TransferStore,
    G: IdGenerator,
{
    /// Creates a coordinator with an explicit id source.
    pub fn with_generator(accounts: Arc<A>, transfers: Arc<T>, ids: G) -> Self {
        Self {
            accounts,
            transfers,
            ids,
            policy: TransferPolicy::default(),
        }
    }

    /// Replaces the policy.
    pub fn with_policy(mut self, policy: TransferPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Executes one transfer to a terminal outcome.
    ///
    /// Replaying with the same transfer id returns the stored outcome
    /// without re-executing (at-most-once). A PENDING record left by a
    /// crashed prior attempt is resumed from its stored intent.
    pub async fn execute(&self, cmd: TransferCommand) -> Result<TransferOutcome, TransferError> {
        let transfer_id = cmd.transfer_id.unwrap_or_else(|| self.ids.next());

        // Idempotency check before anything else.
        if let Some(existing) = self.transfers.find_by_id(&transfer_id).await? {
            return self.resume(&cmd, existing).await;
        }

        // Validation happens before the record exists: these rejections
        // leave no trace in the transfer store.
        if !cmd.amount.is_positive() {
            return Err(DomainError::NonPositiveAmount.into());
        }
        if cmd.from_account == cmd.to_account {
            return Err(DomainError::SameAccountTransfer.into());
        }

        // Write-ahead of intent: the PENDING record is durable before any
        // balance is touched.
        let record = TransferRecord::pending(
            transfer_id,
            cmd.from_account.clone(),
            cmd.to_account.clone(),
            cmd.amount,
        );
        match self.transfers.create_if_absent(record.clone()).await? {
            InsertOutcome::Created => {}
            // Lost a creation race with a concurrent caller using the same id.
            InsertOutcome::Exists(existing) => return self.resume(&cmd, existing).await,
        }

        debug!(%transfer_id, from = %record.from_account, to = %record.to_account,
               amount = %record.amount, "transfer intent recorded");
        self.drive(record).await
    }

    /// Handles a transfer id that already has a record.
    async fn resume(
        &self,
        cmd: &TransferCommand,
        existing: TransferRecord,
    ) -> Result<TransferOutcome, TransferError> {
        // A reused id must describe the identical request; the stored
        // intent is the truth, never a second caller-supplied amount.
        if cmd.from_account != existing.from_account
            || cmd.to_account != existing.to_account
            || cmd.amount != existing.amount
        {
            return Err(DomainError::TransferIdReused.into());
        }

        if existing.status.is_terminal() {
            debug!(transfer_id = %existing.id, status = %existing.status,
                   "replay of settled transfer, returning stored outcome");
            return Ok(TransferOutcome::from_record(&existing));
        }

        debug!(transfer_id = %existing.id, "resuming pending transfer");
        self.drive(existing).await
    }

    /// Drives a PENDING record to a terminal status: ordered load, apply,
    /// dual CAS, finalize. Retries the whole attempt on version conflicts.
    async fn drive(&self, record: TransferRecord) -> Result<TransferOutcome, TransferError> {
        for attempt in 1..=self.policy.max_attempts {
            // A concurrent duplicate submission of the same id may have
            // settled the record between attempts; the terminal state wins.
            // The refreshed record also carries the latest commit stamp.
            let mut stamp = record.applied_versions;
            if let Some(current) = self.transfers.find_by_id(&record.id).await? {
                if current.status.is_terminal() {
                    return Ok(TransferOutcome::from_record(&current));
                }
                stamp = current.applied_versions;
            }

            // Accounts are always acquired in the total order of their
            // numbers, not in debit/credit order.
            let from_first = record.from_account < record.to_account;
            let (first_id, second_id) = if from_first {
                (&record.from_account, &record.to_account)
            } else {
                (&record.to_account, &record.from_account)
            };

            let Some(first) = self.accounts.load(first_id).await? else {
                return self.fail(&record, FailureReason::AccountNotFound).await;
            };
            let Some(second) = self.accounts.load(second_id).await? else {
                return self.fail(&record, FailureReason::AccountNotFound).await;
            };
            let (from, to) = if from_first {
                (first, second)
            } else {
                (second, first)
            };

            // A stamp left on a PENDING record means a prior attempt was
            // interrupted after starting its writes. Any account whose
            // version reached the stamped value already carries that leg;
            // re-applying it would move the money twice.
            if let Some(applied) = stamp {
                let from_done = from.version >= applied.from_version;
                let to_done = to.version >= applied.to_version;
                if from_done && to_done {
                    debug!(transfer_id = %record.id,
                           "both legs landed in an interrupted attempt, finalizing only");
                    return self.finalize(&record).await;
                }
                if from_done != to_done {
                    // Half-committed: one leg landed, so the transfer can
                    // only move forward. Apply the remaining leg alone.
                    let (old, new) = if to_done {
                        match from.debit(record.amount) {
                            Ok(debited) => (from, debited),
                            Err(e) => return Err(StoreError::Conflict(e.to_string()).into()),
                        }
                    } else {
                        match to.credit(record.amount) {
                            Ok(credited) => (to, credited),
                            Err(e) => return Err(StoreError::Conflict(e.to_string()).into()),
                        }
                    };
                    match self.accounts.compare_and_swap(&old, &new).await {
                        Ok(()) => return self.finalize(&record).await,
                        Err(StoreError::VersionConflict) => {
                            self.backoff(attempt).await;
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                // Neither leg landed: the prior attempt died before its
                // writes; drive a fresh attempt below.
            }

            // STOPPED credit policy lives here, not in the aggregate.
            if !self.policy.allow_credit_to_stopped && to.status == AccountStatus::Stopped {
                return self.fail(&record, FailureReason::AccountNotActive).await;
            }

            let debited = match from.debit(record.amount) {
                Ok(account) => account,
                Err(e) => return self.fail_on_rule(&record, e).await,
            };
            let credited = match to.credit(record.amount) {
                Ok(account) => account,
                Err(e) => return self.fail_on_rule(&record, e).await,
            };

            // Stamp the record with the versions this commit will produce
            // before touching either balance. A later driver of the same
            // record uses the stamp to recognize writes that landed.
            let stamp = AppliedVersions {
                from_version: debited.version,
                to_version: credited.version,
            };
            if let Err(e) = self
                .transfers
                .set_applied_versions(&record.id, Some(stamp))
                .await
            {
                return self.settled_or(&record.id, e).await;
            }

            // Commit in acquisition order. Spawned: once the first CAS
            // lands, caller cancellation must not abandon the transfer.
            let (first_pair, second_pair) = if from_first {
                ((from, debited), (to, credited))
            } else {
                ((to, credited), (from, debited))
            };
            let accounts = Arc::clone(&self.accounts);
            let transfers = Arc::clone(&self.transfers);
            let transfer_id = record.id;
            let commit = tokio::spawn(async move {
                commit_and_finalize(accounts, transfers, transfer_id, first_pair, second_pair)
                    .await
            });

            match commit.await {
                Ok(Ok(CommitResult::Committed)) => {
                    debug!(%transfer_id, attempt, "transfer committed");
                    return Ok(TransferOutcome {
                        transfer_id: record.id,
                        status: TransferStatus::Completed,
                        failure_reason: None,
                    });
                }
                Ok(Ok(CommitResult::Conflict)) => {
                    debug!(%transfer_id, attempt, "version conflict, retrying");
                    // Neither write survived this attempt (the second leg
                    // was compensated if it had to be), so the stamp no
                    // longer describes anything in flight.
                    if let Err(e) = self.transfers.set_applied_versions(&record.id, None).await {
                        return self.settled_or(&record.id, e).await;
                    }
                    self.backoff(attempt).await;
                }
                Ok(Err(e)) => return self.settled_or(&record.id, e).await,
                Err(join) => {
                    return Err(StoreError::Unavailable(join.to_string()).into());
                }
            }
        }

        warn!(transfer_id = %record.id, attempts = self.policy.max_attempts,
              "retry budget exhausted");
        self.fail(&record, FailureReason::ConcurrentModification).await
    }

    /// Marks the record COMPLETED without touching balances; used when the
    /// account writes are already in place.
    async fn finalize(&self, record: &TransferRecord) -> Result<TransferOutcome, TransferError> {
        if let Err(e) = self
            .transfers
            .update_status(&record.id, TransferStatus::Completed, None)
            .await
        {
            return self.settled_or(&record.id, e).await;
        }
        Ok(TransferOutcome {
            transfer_id: record.id,
            status: TransferStatus::Completed,
            failure_reason: None,
        })
    }

    /// Marks the record FAILED and returns the terminal outcome.
    async fn fail(
        &self,
        record: &TransferRecord,
        reason: FailureReason,
    ) -> Result<TransferOutcome, TransferError> {
        if let Err(e) = self
            .transfers
            .update_status(&record.id, TransferStatus::Failed, Some(reason))
            .await
        {
            return self.settled_or(&record.id, e).await;
        }
        debug!(transfer_id = %record.id, %reason, "transfer failed");
        Ok(TransferOutcome {
            transfer_id: record.id,
            status: TransferStatus::Failed,
            failure_reason: Some(reason),
        })
    }

    /// A rejected record write may mean a concurrent driver of the same id
    /// settled the record first; its terminal outcome wins over the error.
    async fn settled_or(
        &self,
        id: &TransferId,
        err: StoreError,
    ) -> Result<TransferOutcome, TransferError> {
        if let Some(current) = self.transfers.find_by_id(id).await? {
            if current.status.is_terminal() {
                debug!(transfer_id = %id, status = %current.status,
                       "record settled concurrently, returning its outcome");
                return Ok(TransferOutcome::from_record(&current));
            }
        }
        Err(err.into())
    }

    /// Maps an apply-time domain rule violation onto a terminal FAILED.
    async fn fail_on_rule(
        &self,
        record: &TransferRecord,
        error: DomainError,
    ) -> Result<TransferOutcome, TransferError> {
        let reason = match error {
            DomainError::InsufficientFunds { .. } => FailureReason::InsufficientFunds,
            DomainError::AccountNotActive { .. } => FailureReason::AccountNotActive,
            DomainError::CurrencyMismatch { .. } => FailureReason::CurrencyMismatch,
            // Anything else here (arithmetic overflow) is not a rule the
            // caller can act on; leave the record PENDING and surface it
            // as a retryable condition.
            other => return Err(StoreError::Conflict(other.to_string()).into()),
        };
        self.fail(record, reason).await
    }

    async fn backoff(&self, attempt: u32) {
        let jitter_cap = self.policy.backoff_jitter.as_millis() as u64;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_cap)
        };
        let delay = self.policy.backoff_base * attempt + Duration::from_millis(jitter);
        tokio::time::sleep(delay).await;
    }
}

enum CommitResult {
    Committed,
    Conflict,
}

/// The commit phase: CAS both accounts in acquisition order, then mark the
/// record COMPLETED. Runs detached from the caller.
///
/// If the second CAS loses its race after the first already landed, the
/// first account is compensated back to its prior balance and the whole
/// attempt reports a conflict for the caller to retry.
async fn commit_and_finalize<A, T>(
    accounts: Arc<A>,
    transfers: Arc<T>,
    transfer_id: TransferId,
    first: (Account, Account),
    second: (Account, Account),
) -> Result<CommitResult, StoreError>
where
    A: AccountStore,
    T: TransferStore,
{
    let (first_old, first_new) = first;
    let (second_old, second_new) = second;

    match accounts.compare_and_swap(&first_old, &first_new).await {
        Ok(()) => {}
        Err(StoreError::VersionConflict) => return Ok(CommitResult::Conflict),
        Err(e) => return Err(e),
    }

    match accounts.compare_and_swap(&second_old, &second_new).await {
        Ok(()) => {}
        Err(StoreError::VersionConflict) => {
            roll_back(accounts.as_ref(), &first_old, &first_new).await?;
            return Ok(CommitResult::Conflict);
        }
        Err(e) => {
            // Infrastructure failure mid-commit: try to undo the first
            // leg; if that also fails the record stays PENDING for the
            // reconciliation sweep to settle.
            roll_back(accounts.as_ref(), &first_old, &first_new).await?;
            return Err(e);
        }
    }

    // The single source of truth for "did the money move".
    transfers
        .update_status(&transfer_id, TransferStatus::Completed, None)
        .await?;
    Ok(CommitResult::Committed)
}

const ROLL_BACK_ATTEMPTS: u32 = 8;

/// Reverses one committed leg by applying the opposite balance delta to
/// whatever the account looks like now.
async fn roll_back<A: AccountStore>(
    accounts: &A,
    old: &Account,
    committed: &Account,
) -> Result<(), StoreError> {
    let delta = committed
        .balance
        .checked_sub(old.balance)
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

    for _ in 0..ROLL_BACK_ATTEMPTS {
        let current = accounts
            .load(&old.id)
            .await?
            .ok_or(StoreError::NotFound)?;
        let restored_balance = current
            .balance
            .checked_sub(delta)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        // A concurrent transfer may have spent the credited funds already;
        // compensation must never push the balance below zero. Stop and
        // leave the record PENDING for a retry once the account recovers.
        if restored_balance.is_negative() {
            warn!(account = %old.id, "compensation would overdraw, leaving record pending");
            return Err(StoreError::Unavailable(
                "compensation would overdraw the account".into(),
            ));
        }
        let restored = Account::from_parts(
            current.id.clone(),
            current.status,
            restored_balance,
            current.version + 1,
        );
        match accounts.compare_and_swap(&current, &restored).await {
            Ok(()) => return Ok(()),
            Err(StoreError::VersionConflict) => continue,
            Err(e) => return Err(e),
        }
    }

    warn!(account = %old.id, "compensation lost {} races, leaving record pending", ROLL_BACK_ATTEMPTS);
    Err(StoreError::Unavailable(
        "compensation retries exhausted".into(),
    ))
}
