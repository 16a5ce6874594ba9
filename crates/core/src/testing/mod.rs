//! Testing utilities and controllable doubles.
//!
//! These stand in for the classifier, drafter and storage backends so the
//! workflow and HTTP layer can be exercised without models, network access
//! or a healthy database.
//!
//! # Example
//!
//! ```rust,ignore
//! use helpdesk_core::testing::{MockClassifier, MockDrafter};
//!
//! let classifier = MockClassifier::fixed(Category::Refund);
//! let drafter = MockDrafter::failing("quota exceeded");
//! ```

mod failing_store;
mod mock_classifier;
mod mock_drafter;

pub use failing_store::FailingSessionFactory;
pub use mock_classifier::MockClassifier;
pub use mock_drafter::{MockDrafter, RecordedDraft};
