//! JSON codec for process variables.
//!
//! Decoding is the only fallible direction: job variables come from the
//! engine and may be malformed or belong to a different process shape.
//! Encoding an in-memory value always succeeds.

use thiserror::Error;

use crate::variables::{CustomerVariables, ProcessVariables, SellerVariables, VariablesKind};

/// Job variables could not be decoded into the expected shape.
#[derive(Debug, Error)]
#[error("failed to decode {kind} variables: {source}")]
pub struct DecodeError {
    kind: VariablesKind,
    #[source]
    source: serde_json::Error,
}

impl DecodeError {
    pub fn kind(&self) -> VariablesKind {
        self.kind
    }
}

/// Decode raw job variables into the given payload shape.
///
/// Unknown fields are ignored: a job carries every variable visible in its
/// scope, not just the ones this worker reads.
pub fn decode(raw: &str, kind: VariablesKind) -> Result<ProcessVariables, DecodeError> {
    let wrap = |source| DecodeError { kind, source };
    match kind {
        VariablesKind::Customer => serde_json::from_str::<CustomerVariables>(raw)
            .map(ProcessVariables::Customer)
            .map_err(wrap),
        VariablesKind::Seller => serde_json::from_str::<SellerVariables>(raw)
            .map(ProcessVariables::Seller)
            .map_err(wrap),
    }
}

/// Encode process variables as a JSON object string.
pub fn encode(variables: &ProcessVariables) -> String {
    let encoded = match variables {
        ProcessVariables::Customer(v) => serde_json::to_string(v),
        ProcessVariables::Seller(v) => serde_json::to_string(v),
    };
    // Plain structs with string keys and integer/bool/string leaves cannot fail.
    encoded.unwrap_or_else(|_| unreachable!("process variables always serialize"))
}
