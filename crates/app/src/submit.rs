//! Submit boundary: one submission at a time, every outcome turned into a toast.

use crate::bulk_delete_environments::{BulkDeleteOutput, bulk_delete_environments};
use crate::bulk_update_environments::{BulkUpdateInput, BulkUpdateOutput, bulk_update_environments};
use crate::create_environment::create_environment;
use crate::form_state::FormSnapshot;
use crate::gateway::EnvironmentGatewayDeps;
use crate::transform::{strip_untouched, to_bulk_patch, to_new_environment, to_update_patch};
use crate::update_environment::{UpdateEnvironmentInput, update_environment};
use codex_env_domain::{EnvironmentId, EnvironmentRecord};
use codex_env_ports::NotifierPort;
use codex_env_shared::{
    CorrelationId, ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, RequestContext, Result,
    Validate,
};
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Headline for every validation failure.
pub const INVALID_INPUT_MESSAGE: &str = "Please check your input and try again";

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome<T> {
    /// Another submission was in flight; nothing happened.
    Busy,
    /// The form did not validate; nothing was sent.
    Invalid(ErrorEnvelope),
    /// The gateway failed or the call panicked.
    Failed(ErrorEnvelope),
    /// The gateway succeeded.
    Completed(T),
}

impl<T> SubmitOutcome<T> {
    /// True for `Completed`.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

#[derive(Clone, Copy)]
struct Messages {
    operation: &'static str,
    success: &'static str,
    failure: &'static str,
    unexpected: &'static str,
}

const CREATE: Messages = Messages {
    operation: "create",
    success: "Environment created successfully",
    failure: "Failed to create environment",
    unexpected: "An unexpected error occurred while creating the environment.",
};

const UPDATE: Messages = Messages {
    operation: "update",
    success: "Environment updated successfully",
    failure: "Failed to update environment",
    unexpected: "An unexpected error occurred while updating the environment.",
};

const BULK_UPDATE: Messages = Messages {
    operation: "bulk_update",
    success: "Environments updated successfully",
    failure: "Failed to update environments",
    unexpected: "An unexpected error occurred while updating the environments.",
};

const BULK_DELETE: Messages = Messages {
    operation: "bulk_delete",
    success: "Environments deleted successfully",
    failure: "Failed to delete environments",
    unexpected: "An unexpected error occurred while deleting the environments.",
};

/// Releases the in-flight flag when the submission ends, including by panic.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives gateway calls from form snapshots and reports them to the user.
pub struct SubmitBoundary {
    deps: EnvironmentGatewayDeps,
    notifier: Arc<dyn NotifierPort>,
    in_flight: AtomicBool,
}

impl SubmitBoundary {
    /// Build a boundary over the gateway dependencies and a toast sink.
    #[must_use]
    pub fn new(deps: EnvironmentGatewayDeps, notifier: Arc<dyn NotifierPort>) -> Self {
        Self {
            deps,
            notifier,
            in_flight: AtomicBool::new(false),
        }
    }

    /// True while a submission is running; the submit control stays disabled.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Transform, validate and create.
    pub async fn submit_create(&self, snapshot: &FormSnapshot) -> SubmitOutcome<EnvironmentId> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return SubmitOutcome::Busy;
        };
        let environment = match to_new_environment(snapshot) {
            Ok(environment) => environment,
            Err(violation) => return self.invalid(violation.into()),
        };
        let ctx = submission_context();
        let outcome = self
            .run(CREATE, create_environment(&ctx, &self.deps, environment))
            .await;
        if outcome.is_completed() {
            self.notifier.success(CREATE.success, None);
        }
        outcome
    }

    /// Transform, validate and update one row with every column.
    pub async fn submit_update(
        &self,
        id: EnvironmentId,
        snapshot: &FormSnapshot,
    ) -> SubmitOutcome<EnvironmentRecord> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return SubmitOutcome::Busy;
        };
        let patch = match to_update_patch(snapshot) {
            Ok(patch) => patch,
            Err(violation) => return self.invalid(violation.into()),
        };
        let ctx = submission_context();
        let outcome = self
            .run(
                UPDATE,
                update_environment(&ctx, &self.deps, UpdateEnvironmentInput { id, patch }),
            )
            .await;
        if outcome.is_completed() {
            self.notifier.success(UPDATE.success, None);
        }
        outcome
    }

    /// Apply the touched fields of a bulk-edit form to every listed row.
    pub async fn submit_bulk_update(
        &self,
        ids: Vec<EnvironmentId>,
        snapshot: &FormSnapshot,
    ) -> SubmitOutcome<BulkUpdateOutput> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return SubmitOutcome::Busy;
        };
        let patch = strip_untouched(to_bulk_patch(snapshot)).with_setup_script_rule();
        if let Err(violation) = patch.validate() {
            return self.invalid(violation.into());
        }
        let ctx = submission_context();
        let outcome = self
            .run(
                BULK_UPDATE,
                bulk_update_environments(&ctx, &self.deps, BulkUpdateInput { ids, patch }),
            )
            .await;
        if let SubmitOutcome::Completed(output) = &outcome {
            let description = count_description(output.updated_count, "updated");
            self.notifier
                .success(BULK_UPDATE.success, Some(&description));
        }
        outcome
    }

    /// Delete every listed row.
    pub async fn submit_bulk_delete(
        &self,
        ids: Vec<EnvironmentId>,
    ) -> SubmitOutcome<BulkDeleteOutput> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return SubmitOutcome::Busy;
        };
        let ctx = submission_context();
        let outcome = self
            .run(BULK_DELETE, bulk_delete_environments(&ctx, &self.deps, ids))
            .await;
        if let SubmitOutcome::Completed(output) = &outcome {
            let description = count_description(output.deleted_count, "deleted");
            self.notifier
                .success(BULK_DELETE.success, Some(&description));
        }
        outcome
    }

    fn invalid<T>(&self, error: ErrorEnvelope) -> SubmitOutcome<T> {
        self.notifier
            .error(INVALID_INPUT_MESSAGE, Some(error.message.as_str()));
        SubmitOutcome::Invalid(error)
    }

    async fn run<T>(
        &self,
        messages: Messages,
        call: impl Future<Output = Result<T>>,
    ) -> SubmitOutcome<T> {
        let result = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(ErrorEnvelope::unexpected(
                ErrorCode::internal(),
                format!("environment {} panicked", messages.operation),
                ErrorClass::NonRetriable,
            )),
        };
        match result {
            Ok(value) => SubmitOutcome::Completed(value),
            Err(error) if error.is_validation() => self.invalid(error),
            Err(error) => {
                match error.kind {
                    ErrorKind::Unexpected => self.notifier.error(messages.unexpected, None),
                    ErrorKind::Expected | ErrorKind::Invariant => self
                        .notifier
                        .error(messages.failure, Some(error.message.as_str())),
                }
                SubmitOutcome::Failed(error)
            },
        }
    }
}

fn submission_context() -> RequestContext {
    RequestContext::new(CorrelationId::new_submission_id())
}

/// "1 environment updated." / "3 environments updated."
fn count_description(count: usize, verb: &str) -> String {
    let noun = if count == 1 {
        "environment"
    } else {
        "environments"
    };
    format!("{count} {noun} {verb}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_description_pluralizes() {
        assert_eq!(count_description(1, "updated"), "1 environment updated.");
        assert_eq!(count_description(3, "deleted"), "3 environments deleted.");
        assert_eq!(count_description(0, "deleted"), "0 environments deleted.");
    }

    #[test]
    fn in_flight_guard_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        let first = InFlight::acquire(&flag);
        assert!(first.is_some());
        assert!(InFlight::acquire(&flag).is_none());
        drop(first);
        assert!(InFlight::acquire(&flag).is_some());
    }
}
