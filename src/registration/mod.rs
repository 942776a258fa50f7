// Registration form core: draft state, validation rules and the
// submission flow that talks to a record store

pub mod flow;
pub mod policy;
pub mod state_machine;
pub mod types;
pub mod validation;


pub use flow::{RegistrationFlow, SubmitError};
pub use policy::{IdentifierPolicy, RegistrationPolicy, IDENTIFIER_FIELD};
pub use state_machine::FlowPhase;
pub use types::{
    DraftRegistration, Field, FieldUpdate, HandPreference, OwnedProducts, RecordId,
    StoredRegistration, SubmissionReceipt, NO_PRODUCTS_TAG,
};
pub use validation::{validate, FieldError, FieldErrorKind, ValidationState};
