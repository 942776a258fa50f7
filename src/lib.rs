// Golf Registration Library - event sign-up form core
// This exposes the core components for embedding and integration

pub mod config;
pub mod registration;
pub mod store;
pub mod telemetry;

// Re-export key types for easy access
pub use crate::config::{ObservabilityConfig, RegistrationConfig, StoreConfig};
pub use crate::registration::{
    validate, DraftRegistration, Field, FieldError, FieldErrorKind, FieldUpdate, FlowPhase,
    HandPreference, IdentifierPolicy, OwnedProducts, RecordId, RegistrationFlow,
    RegistrationPolicy, StoredRegistration, SubmissionReceipt, SubmitError, ValidationState,
};
pub use crate::store::{InMemoryRecordStore, JsonLinesRecordStore, RecordStore, StoreError};
pub use crate::telemetry::{create_submission_span, generate_correlation_id, init_telemetry};
