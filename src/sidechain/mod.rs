//! Sidechain data model
//!
//! This module contains:
//! - Opaque proof-system values (field elements, proofs, verification keys)
//! - Creation and withdrawal-request parameter bundles
//! - The closed set of cross-chain outputs a transaction can carry
//! - Sidechain records tracked by the mainchain

pub mod error;
pub mod intent;
pub mod params;
pub mod state;
pub mod types;

pub use error::StructuralError;
pub use intent::{creation_sidechain_id, CrossChainIntent};
pub use params::{BwtRequestParameters, CreationParameters};
pub use state::{Sidechain, SidechainView};
pub use types::{
    Epoch, FieldElement, McAddress, ScConstant, ScProof, SidechainId, VerifyingKey,
    EPOCH_NOT_INITIALIZED, EPOCH_NULL, FIELD_ELEMENT_SIZE, MAX_SC_DATA_LEN, SC_PROOF_SIZE,
    SC_VK_SIZE,
};
