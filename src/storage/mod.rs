//! Storage Module
//!
//! This module provides storage for the swap negotiation service: the swap
//! proposal records and their append-only transition history.

pub mod swap_proposals;

// Re-export for convenience
pub use swap_proposals::{
    ListRole, OwnershipTransferType, SwapAction, SwapMode, SwapProposal, SwapProposalStore,
    SwapStatus, TransitionRecord,
};
