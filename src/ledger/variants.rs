//! Entry-function call shapes accepted by the signal module
//!
//! Deployments of the remote module differ in which entry points they
//! expose. Each shape is a [`CallVariant`]; the submitter walks
//! [`DEFAULT_VARIANTS`] in order. Supporting a new deployment means adding a
//! variant here.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::envelope::EncryptedEnvelope;

/// Module that exposes the signal entry points
pub const SIGNAL_MODULE: &str = "signal_vault";

/// Ledger account a call is made from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAccount {
    pub address: String,
    /// Hex signing-key material
    pub signing_key_material: String,
}

impl LedgerAccount {
    pub fn new(address: impl Into<String>, signing_key_material: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            signing_key_material: signing_key_material.into(),
        }
    }
}

/// JSON entry-function payload as submitted to the node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryFunctionPayload {
    #[serde(rename = "type")]
    pub payload_type: String,
    /// `<module address>::<module>::<function>`
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
}

impl EntryFunctionPayload {
    pub fn new(module_address: &str, function: &str, arguments: Vec<Value>) -> Self {
        Self {
            payload_type: "entry_function_payload".to_string(),
            function: format!("{}::{}::{}", module_address, SIGNAL_MODULE, function),
            type_arguments: Vec::new(),
            arguments,
        }
    }

    /// Best-effort registration of the calling account with the module
    pub fn register_agent(module_address: &str) -> Self {
        Self::new(module_address, "register_agent", Vec::new())
    }
}

/// Everything a variant may put on the wire
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeCall<'a> {
    /// Account the signal is recorded against
    pub counterparty: &'a str,
    pub envelope: &'a EncryptedEnvelope,
    pub unix_seconds: i64,
}

/// One accepted call shape
#[derive(Debug, Clone, Copy)]
pub struct CallVariant {
    pub name: &'static str,
    pub function: &'static str,
    pub encode: fn(&EnvelopeCall<'_>) -> Vec<Value>,
}

impl CallVariant {
    pub fn payload(&self, module_address: &str, call: &EnvelopeCall<'_>) -> EntryFunctionPayload {
        EntryFunctionPayload::new(module_address, self.function, (self.encode)(call))
    }
}

fn hex_bytes(bytes: &[u8]) -> Value {
    Value::String(format!("0x{}", hex::encode(bytes)))
}

/// u64 arguments travel as decimal strings
fn u64_arg(value: i64) -> Value {
    Value::String(value.max(0).to_string())
}

fn encode_full(call: &EnvelopeCall<'_>) -> Vec<Value> {
    let envelope = call.envelope;
    vec![
        json!(call.counterparty),
        // storage key and event id carry the same digest
        hex_bytes(&envelope.content_hash),
        hex_bytes(&envelope.content_hash),
        hex_bytes(&envelope.ciphertext),
        hex_bytes(&envelope.iv),
        hex_bytes(&envelope.aad),
        hex_bytes(&envelope.tag),
        u64_arg(call.unix_seconds),
    ]
}

fn encode_ciphertext_only(call: &EnvelopeCall<'_>) -> Vec<Value> {
    vec![hex_bytes(&call.envelope.ciphertext), u64_arg(call.unix_seconds)]
}

fn encode_with_counterparty(call: &EnvelopeCall<'_>) -> Vec<Value> {
    vec![
        json!(call.counterparty),
        hex_bytes(&call.envelope.ciphertext),
        u64_arg(call.unix_seconds),
    ]
}

/// Full envelope with digests, IV, AAD and tag
pub const FULL_ENVELOPE: CallVariant = CallVariant {
    name: "full_envelope",
    function: "store_encrypted_signal",
    encode: encode_full,
};

/// Ciphertext and timestamp only
pub const CIPHERTEXT_ONLY: CallVariant = CallVariant {
    name: "ciphertext_only",
    function: "store_signal",
    encode: encode_ciphertext_only,
};

/// Counterparty, ciphertext and timestamp
pub const WITH_COUNTERPARTY: CallVariant = CallVariant {
    name: "with_counterparty",
    function: "store_signal_for",
    encode: encode_with_counterparty,
};

/// Priority order the submitter tries
pub const DEFAULT_VARIANTS: [CallVariant; 3] = [FULL_ENVELOPE, CIPHERTEXT_ONLY, WITH_COUNTERPARTY];
