//! Negotiation Module
//!
//! Lifecycle of swap proposals: draft validation, the state machine, the
//! eligibility checker, the valuation advisor and the engine tying them to
//! storage and external collaborators.

pub mod draft;
pub mod eligibility;
pub mod engine;
pub mod state_machine;
pub mod valuation;
pub mod view;

pub use draft::{DraftListings, SwapDraft};
pub use eligibility::{EligibilityChecker, EligibilityDecision, ParticipantRole};
pub use engine::SwapEngine;
pub use state_machine::{ActorRule, SideEffect};
pub use valuation::{suggest_difference, PaymentDirection};
pub use view::SwapParticipantView;
