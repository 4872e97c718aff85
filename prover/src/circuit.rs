//! Circuit descriptors and witness inputs.

use privacy_crypto::field::fr_to_decimal;
use privacy_crypto::Fr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitKind {
    /// Proves knowledge of the signature behind an ownership commitment.
    Ownership,
    /// Proves membership and non-spending of a credit note.
    CreditNote,
}

impl CircuitKind {
    pub const fn public_signal_count(self) -> usize {
        match self {
            Self::Ownership => 3,
            Self::CreditNote => 5,
        }
    }

    /// Words in the Solidity proof tuple: `pA` (2), `pB` (4), `pC` (2) and
    /// the public signals.
    pub const fn proof_words(self) -> usize {
        8 + self.public_signal_count()
    }

    /// Length of the statically encoded proof tuple in calldata.
    pub const fn proof_abi_len(self) -> usize {
        32 * self.proof_words()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Ownership => "ownership",
            Self::CreditNote => "credit-note",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignalValue {
    Scalar(Fr),
    Array(Vec<Fr>),
}

impl SignalValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Scalar(value) => Value::String(fr_to_decimal(value)),
            Self::Array(values) => Value::Array(
                values
                    .iter()
                    .map(|value| Value::String(fr_to_decimal(value)))
                    .collect(),
            ),
        }
    }

    fn flatten_into(&self, out: &mut Vec<Fr>) {
        match self {
            Self::Scalar(value) => out.push(*value),
            Self::Array(values) => out.extend_from_slice(values),
        }
    }
}

impl From<Fr> for SignalValue {
    fn from(value: Fr) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<Fr>> for SignalValue {
    fn from(values: Vec<Fr>) -> Self {
        Self::Array(values)
    }
}

#[derive(Clone, Debug)]
struct Signal {
    name: &'static str,
    value: SignalValue,
    public: bool,
}

/// Named witness inputs for one proof. Public signals keep the order in
/// which they were added, which must match the circuit's declaration order.
#[derive(Clone, Debug)]
pub struct CircuitInputs {
    kind: CircuitKind,
    signals: Vec<Signal>,
}

impl CircuitInputs {
    pub fn new(kind: CircuitKind) -> Self {
        Self {
            kind,
            signals: Vec::new(),
        }
    }

    pub fn private(mut self, name: &'static str, value: impl Into<SignalValue>) -> Self {
        self.signals.push(Signal {
            name,
            value: value.into(),
            public: false,
        });
        self
    }

    pub fn public(mut self, name: &'static str, value: impl Into<SignalValue>) -> Self {
        self.signals.push(Signal {
            name,
            value: value.into(),
            public: true,
        });
        self
    }

    pub fn kind(&self) -> CircuitKind {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<&SignalValue> {
        self.signals
            .iter()
            .find(|signal| signal.name == name)
            .map(|signal| &signal.value)
    }

    /// Witness-generator input: every signal as decimal strings.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for signal in &self.signals {
            map.insert(signal.name.to_string(), signal.value.to_json());
        }
        Value::Object(map)
    }

    pub fn public_signals(&self) -> Vec<Fr> {
        let mut out = Vec::with_capacity(self.kind.public_signal_count());
        for signal in self.signals.iter().filter(|signal| signal.public) {
            signal.value.flatten_into(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_layout_matches_public_signal_count() {
        assert_eq!(CircuitKind::Ownership.proof_abi_len(), 11 * 32);
        assert_eq!(CircuitKind::CreditNote.proof_abi_len(), 13 * 32);
    }

    #[test]
    fn inputs_serialize_as_decimal_strings() {
        let inputs = CircuitInputs::new(CircuitKind::Ownership)
            .private("signatureV", Fr::from(27u64))
            .public("commitmentHash", Fr::from(5u64))
            .private("path", vec![Fr::from(1u64), Fr::from(2u64)])
            .public("nonce", Fr::from(9u64));
        let json = inputs.to_json();
        assert_eq!(json["signatureV"], "27");
        assert_eq!(json["path"], serde_json::json!(["1", "2"]));
        assert_eq!(
            inputs.public_signals(),
            vec![Fr::from(5u64), Fr::from(9u64)]
        );
        assert_eq!(inputs.get("nonce"), Some(&SignalValue::Scalar(Fr::from(9u64))));
    }
}
