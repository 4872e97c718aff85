//! Intent binding.
//!
//! A proof commits to the exact contract call it authorizes. The call is ABI
//! encoded with zero-valued proof tuples in the leading parameter slots, the
//! proof bytes are cut out again (they are unknown until the proof exists),
//! and the remaining `selector ‖ arguments` buffer is hashed into the field.
//! The contract repeats the same cut on the real calldata, so an intent hash
//! is only valid for one function and one argument list.

use alloy_dyn_abi::{DynSolValue, JsonAbiExt, Specifier};
use alloy_json_abi::{Function, JsonAbi};
use privacy_crypto::{keccak_to_field, Fr, PoseidonHash};

use crate::circuit::CircuitKind;
use crate::error::ProverError;
use crate::groth16::ProofCallData;

pub const SELECTOR_LEN: usize = 4;

/// Proof tuples an issuer-proxy call carries ahead of its own arguments.
pub fn proof_slots(with_credit_note: bool) -> &'static [CircuitKind] {
    if with_credit_note {
        &[CircuitKind::Ownership, CircuitKind::CreditNote]
    } else {
        &[CircuitKind::Ownership]
    }
}

pub fn select_function<'a>(
    abi: &'a JsonAbi,
    name: &str,
    arity: usize,
) -> Result<&'a Function, ProverError> {
    let overloads = abi
        .function(name)
        .ok_or_else(|| ProverError::InvalidArgument(format!("function {name} is not in the ABI")))?;
    overloads
        .iter()
        .find(|function| function.inputs.len() == arity)
        .ok_or_else(|| {
            ProverError::InvalidArgument(format!(
                "function {name} has no overload taking {arity} parameters"
            ))
        })
}

/// Full calldata of `name(placeholders..., args...)`.
pub fn encode_with_placeholders(
    abi: &JsonAbi,
    name: &str,
    args: &[DynSolValue],
    proofs: &[CircuitKind],
) -> Result<Vec<u8>, ProverError> {
    let function = select_function(abi, name, proofs.len() + args.len())?;
    let mut values = proofs
        .iter()
        .map(|kind| ProofCallData::placeholder(*kind).to_sol_value())
        .collect::<Result<Vec<_>, _>>()?;
    values.extend_from_slice(args);
    Ok(function.abi_encode_input(&values)?)
}

/// Removes the statically encoded proof tuples that follow the selector.
pub fn strip_proofs(calldata: &[u8], proofs: &[CircuitKind]) -> Result<Vec<u8>, ProverError> {
    let proof_len: usize = proofs.iter().map(|kind| kind.proof_abi_len()).sum();
    if calldata.len() < SELECTOR_LEN + proof_len {
        return Err(ProverError::Abi(format!(
            "calldata of {} bytes cannot hold {} proof bytes",
            calldata.len(),
            proof_len
        )));
    }
    let mut out = Vec::with_capacity(calldata.len() - proof_len);
    out.extend_from_slice(&calldata[..SELECTOR_LEN]);
    out.extend_from_slice(&calldata[SELECTOR_LEN + proof_len..]);
    Ok(out)
}

/// Selector and real arguments of the call, without proof bytes.
pub fn intent_preimage(
    abi: &JsonAbi,
    name: &str,
    args: &[DynSolValue],
    with_credit_note: bool,
) -> Result<Vec<u8>, ProverError> {
    let proofs = proof_slots(with_credit_note);
    let calldata = encode_with_placeholders(abi, name, args, proofs)?;
    strip_proofs(&calldata, proofs)
}

/// Parses textual arguments against the types of the call's non-proof
/// parameters, e.g. `["42", "0xab..."]` for `(uint256,address)`.
pub fn coerce_args(
    abi: &JsonAbi,
    name: &str,
    raw: &[String],
    with_credit_note: bool,
) -> Result<Vec<DynSolValue>, ProverError> {
    let proofs = proof_slots(with_credit_note);
    let function = select_function(abi, name, proofs.len() + raw.len())?;
    function.inputs[proofs.len()..]
        .iter()
        .zip(raw)
        .map(|(param, text)| -> Result<DynSolValue, ProverError> {
            let ty = param.resolve()?;
            Ok(ty.coerce_str(text)?)
        })
        .collect()
}

pub fn intent_hash(poseidon: &PoseidonHash, preimage: &[u8]) -> Result<Fr, ProverError> {
    Ok(poseidon.hash(&[keccak_to_field(preimage)])?)
}
