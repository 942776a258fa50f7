use chrono::Utc;
use statig::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

use crate::registration::policy::RegistrationPolicy;
use crate::registration::state_machine::{phase_of, FlowEvent, FlowPhase, RegistrationMachine};
use crate::registration::types::{
    DraftRegistration, Field, FieldUpdate, StoredRegistration, SubmissionReceipt,
};
use crate::registration::validation::{validate, validate_field, FieldError, ValidationState};
use crate::store::{RecordStore, StoreError};
use crate::telemetry::{create_submission_span, generate_correlation_id};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Registration has {} invalid field(s)", .0.error_count())]
    Invalid(ValidationState),
    #[error("The {field} '{value}' is already taken")]
    Conflict { field: Field, value: String },
    #[error("Could not reach the registration service, please try again: {0}")]
    Store(#[from] StoreError),
    #[error("A submission is already in progress")]
    InFlight,
}

impl SubmitError {
    /// Errors the user should see next to the form
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, SubmitError::InFlight)
    }
}

/// Releases the single-flight flag when a submission ends, however it ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One registration form session backed by a record store.
///
/// Every method takes `&self`; draft and validation state live behind
/// short mutexes that are never held across an await.
pub struct RegistrationFlow<S: RecordStore> {
    store: S,
    policy: RegistrationPolicy,
    draft: Mutex<DraftRegistration>,
    validation: Mutex<ValidationState>,
    machine: Mutex<StateMachine<RegistrationMachine>>,
    in_flight: AtomicBool,
}

impl<S: RecordStore> RegistrationFlow<S> {
    pub fn new(store: S, policy: RegistrationPolicy) -> Self {
        Self {
            store,
            policy,
            draft: Mutex::new(DraftRegistration::new()),
            validation: Mutex::new(ValidationState::new()),
            machine: Mutex::new(RegistrationMachine.state_machine()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &RegistrationPolicy {
        &self.policy
    }

    pub fn draft(&self) -> DraftRegistration {
        lock(&self.draft).clone()
    }

    pub fn validation(&self) -> ValidationState {
        lock(&self.validation).clone()
    }

    pub fn phase(&self) -> FlowPhase {
        phase_of(lock(&self.machine).state())
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Apply a field change and re-check that field only
    pub fn update_field(&self, update: FieldUpdate) {
        let field = update.field();
        let result = {
            let mut draft = lock(&self.draft);
            update.apply(&mut draft);
            self.check(field, &draft)
        };
        debug!(field = %field, valid = result.is_ok(), "Field updated");
        self.record(field, result);
        self.handle(FlowEvent::Edit);
    }

    /// Select or deselect an owned-product tag
    pub fn toggle_product(&self, tag: &str) {
        let result = {
            let mut draft = lock(&self.draft);
            draft.products.toggle(tag);
            self.check(Field::OwnedProducts, &draft)
        };
        debug!(tag, valid = result.is_ok(), "Product toggled");
        self.record(Field::OwnedProducts, result);
        self.handle(FlowEvent::Edit);
    }

    /// Re-validate the whole draft without submitting
    pub fn revalidate(&self) -> ValidationState {
        let state = validate(&lock(&self.draft), &self.policy);
        *lock(&self.validation) = state.clone();
        state
    }

    /// Validate, check identifier uniqueness and persist the draft.
    ///
    /// A call made while another submission is pending returns
    /// [`SubmitError::InFlight`] without touching the store. The draft is
    /// cleared on success unless it was edited while the submission ran.
    pub async fn submit(&self) -> Result<SubmissionReceipt, SubmitError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Ignoring submit while another submission is pending");
            return Err(SubmitError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let correlation_id = generate_correlation_id();
        let snapshot = self.draft();
        let span = create_submission_span(
            &correlation_id,
            self.policy
                .identifier
                .is_enabled()
                .then(|| snapshot.identifier.trim()),
        );

        self.run_submission(snapshot).instrument(span).await
    }

    async fn run_submission(
        &self,
        snapshot: DraftRegistration,
    ) -> Result<SubmissionReceipt, SubmitError> {
        self.handle(FlowEvent::Submit);

        let state = validate(&snapshot, &self.policy);
        let uniqueness_field = self.policy.identifier.store_field();
        *lock(&self.validation) = state.clone();
        self.handle(FlowEvent::Validated {
            valid: state.is_valid(),
            needs_uniqueness: uniqueness_field.is_some(),
        });
        if !state.is_valid() {
            info!(errors = state.error_count(), "Registration rejected by validation");
            return Err(SubmitError::Invalid(state));
        }

        let identifier = snapshot.identifier.trim().to_string();
        if let Some(store_field) = uniqueness_field {
            let taken = match self.store.exists(store_field, &identifier).await {
                Ok(taken) => taken,
                Err(e) => return Err(self.store_failed(e)),
            };
            self.handle(FlowEvent::UniquenessChecked { taken });
            if taken {
                info!(field = store_field, "Identifier already registered");
                self.record(
                    Field::Identifier,
                    Err(FieldError::conflict(format!(
                        "Username {identifier} is already taken"
                    ))),
                );
                return Err(SubmitError::Conflict {
                    field: Field::Identifier,
                    value: identifier,
                });
            }
        }

        let record = StoredRegistration::from_draft(&snapshot, &self.policy, Utc::now());
        let record_id = match self.store.append(&record).await {
            Ok(id) => id,
            Err(e) => return Err(self.store_failed(e)),
        };
        self.handle(FlowEvent::Appended);

        let untouched = {
            let mut draft = lock(&self.draft);
            let untouched = *draft == snapshot;
            if untouched {
                *draft = DraftRegistration::new();
            }
            untouched
        };
        if untouched {
            lock(&self.validation).clear();
        } else {
            // Edits made while the store was busy belong to the next registration
            debug!("Draft changed during submission, keeping the edits");
            self.revalidate();
            self.handle(FlowEvent::Edit);
        }
        info!(record_id = %record_id, "Registration stored");

        Ok(SubmissionReceipt {
            record_id,
            identifier: record.username,
            display_name: record.name,
        })
    }

    fn store_failed(&self, error: StoreError) -> SubmitError {
        warn!(error = %error, "Record store failure, draft preserved");
        self.handle(FlowEvent::StoreFailed);
        SubmitError::Store(error)
    }

    fn check(&self, field: Field, draft: &DraftRegistration) -> Result<(), FieldError> {
        validate_field(field, draft, &self.policy)
    }

    fn record(&self, field: Field, result: Result<(), FieldError>) {
        // Identifier never has a validity entry when the form has no username
        if field == Field::Identifier && !self.policy.identifier.is_enabled() {
            return;
        }
        lock(&self.validation).set(field, result);
    }

    fn handle(&self, event: FlowEvent) {
        lock(&self.machine).handle(&event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // State stays usable even if a panicking thread held the lock
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: RecordStore> std::fmt::Debug for RegistrationFlow<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationFlow")
            .field("policy", &self.policy)
            .field("phase", &self.phase())
            .field("in_flight", &self.is_submitting())
            .finish_non_exhaustive()
    }
}
