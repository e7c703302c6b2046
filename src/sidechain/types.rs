//! Opaque proof-system values and identifiers
//!
//! Field elements, proofs and verification keys are fixed-size byte
//! strings whose meaning belongs to the proof system. Here they are only
//! sized, compared and tested for their all-zero null state.

use crate::crypto::{base58check, Hash256};
use crate::sidechain::StructuralError;
use std::fmt;

/// Sidechain identifier
pub type SidechainId = Hash256;

/// Certificate epoch counter
pub type Epoch = i32;

/// No certificate has been accepted for the sidechain yet
pub const EPOCH_NULL: Epoch = -1;

/// Default epoch of a fresh undo entry
pub const EPOCH_NOT_INITIALIZED: Epoch = -2;

pub const FIELD_ELEMENT_SIZE: usize = 96;
pub const SC_PROOF_SIZE: usize = 771;
pub const SC_VK_SIZE: usize = 1544;

/// Largest custom data payload a sidechain can declare
pub const MAX_SC_DATA_LEN: usize = 1024;

/// Mainchain address version prefix
const MC_ADDRESS_PREFIX: [u8; 2] = [0x20, 0x89];

macro_rules! opaque_blob {
    ($(#[$meta:meta])* $name:ident, $size:expr, $what:expr) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(Vec<u8>);

        impl $name {
            pub const SIZE: usize = $size;

            pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, StructuralError> {
                if bytes.len() != Self::SIZE {
                    return Err(StructuralError::InvalidLength {
                        what: $what,
                        expected: Self::SIZE,
                        actual: bytes.len(),
                    });
                }
                Ok(Self(bytes))
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// All-zero bytes are the null value.
            pub fn is_null(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self(vec![0u8; Self::SIZE])
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let head = &self.0[..self.0.len().min(8)];
                write!(f, "{}({}..)", stringify!($name), hex::encode(head))
            }
        }
    };
}

opaque_blob!(
    /// Element of the proof system's scalar field
    FieldElement,
    FIELD_ELEMENT_SIZE,
    "field element"
);
opaque_blob!(
    /// SNARK proof
    ScProof,
    SC_PROOF_SIZE,
    "proof"
);
opaque_blob!(
    /// SNARK verification key
    VerifyingKey,
    SC_VK_SIZE,
    "verification key"
);

/// Optional creation constant: empty, or exactly one field element.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct ScConstant(Vec<u8>);

impl ScConstant {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, StructuralError> {
        if !bytes.is_empty() && bytes.len() != FIELD_ELEMENT_SIZE {
            return Err(StructuralError::InvalidLength {
                what: "constant",
                expected: FIELD_ELEMENT_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// 20-byte mainchain destination of a withdrawal
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct McAddress(pub [u8; 20]);

impl McAddress {
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for McAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58check(&MC_ADDRESS_PREFIX, &self.0))
    }
}

impl fmt::Debug for McAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "McAddress({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_null() {
        assert!(FieldElement::default().is_null());
        assert!(ScProof::default().is_null());
        assert!(VerifyingKey::default().is_null());
        assert_eq!(VerifyingKey::default().as_bytes().len(), SC_VK_SIZE);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(
            ScProof::from_bytes(vec![1u8; 10]),
            Err(StructuralError::InvalidLength {
                what: "proof",
                expected: SC_PROOF_SIZE,
                actual: 10
            })
        );
    }

    #[test]
    fn test_non_zero_is_not_null() {
        let mut bytes = vec![0u8; FIELD_ELEMENT_SIZE];
        bytes[40] = 1;
        assert!(!FieldElement::from_bytes(bytes).unwrap().is_null());
    }

    #[test]
    fn test_constant_shape() {
        assert!(ScConstant::from_bytes(vec![]).unwrap().is_empty());
        assert!(ScConstant::from_bytes(vec![3u8; FIELD_ELEMENT_SIZE]).is_ok());
        assert!(ScConstant::from_bytes(vec![3u8; 5]).is_err());
    }

    #[test]
    fn test_mc_address_display() {
        let address = McAddress([0xAB; 20]);
        assert!(address.to_string().starts_with("zn"));
        assert!(McAddress::default().is_null());
    }
}
