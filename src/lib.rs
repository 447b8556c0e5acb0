//! Swap Negotiation Service Library
//!
//! This crate provides the swap negotiation service of the marketplace: the
//! lifecycle of bilateral swap proposals between two users over listings or
//! free-text described assets. Identity, listings, notification delivery and
//! reputation are external collaborators reached through traits.

pub mod api;
pub mod config;
pub mod error;
pub mod integrations;
pub mod negotiation;
pub mod storage;

// Re-export commonly used types
pub use config::{ApiConfig, Config, IntegrationsConfig, SwapSettings};
pub use error::{Denial, FieldViolation, SwapError};
pub use integrations::{ActingUser, Listing, SwapEvent};
pub use negotiation::{SwapDraft, SwapEngine, SwapParticipantView};
pub use storage::{SwapProposal, SwapProposalStore, SwapStatus};
