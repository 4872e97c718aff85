use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("value does not fit in {width} bytes")]
    Overflow { width: usize },

    #[error("value is not a canonical field element")]
    NonCanonical,

    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("invalid decimal encoding: {0}")]
    InvalidDecimal(String),

    #[error("poseidon error: {0}")]
    Poseidon(String),

    #[error("pedersen generator {0} could not be derived")]
    GeneratorDerivation(usize),

    #[error("pedersen input of {bits} bits exceeds the {max} bits supported")]
    InputTooLong { bits: usize, max: usize },

    #[error("primitive construction failed: {0}")]
    Construction(String),
}
