pub mod error;
pub mod field;
pub mod hashes;
pub mod mimc;
pub mod pedersen;
pub mod registry;

pub use ark_bn254::Fr;
pub use error::CryptoError;
pub use hashes::{keccak256, keccak_to_field, PoseidonHash};
pub use mimc::MimcSponge;
pub use pedersen::PedersenHash;
pub use registry::{PoolPrimitives, PrimitiveRegistry};
