//! Pharmaceutical inquiry extraction.
//!
//! An inbound email is classified as a genuine product inquiry or not, and
//! the inquiry fields are pulled out into a `ParsedInquiry`. The learned
//! company-domain table is consulted before the model call and grown after it.

pub mod aliases;
pub mod dates;
pub mod prompt;
pub mod service;
pub mod types;

pub use service::ExtractionService;
pub use types::{
    Confidence, FailureEnvelope, ParseEmailRequest, ParseOutcome, ParsedInquiry, PurposeIcon,
    SuccessEnvelope, Urgency,
};
