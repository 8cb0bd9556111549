//! Golden EIP-712 vectors.
//!
//! Wallets sign these digests, so every implementation must reproduce them
//! bit for bit.

use highlight_core::eip712::{domain_separator, signing_hash, type_hash};
use highlight_core::{Domain, Types};
use serde_json::{json, Map, Value};

/// A golden typed-data vector.
#[derive(Debug, Clone)]
pub struct TypedDataVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub domain: Value,
    pub types: Value,
    pub primary_type: &'static str,
    pub message: Value,
    /// Expected `typeHash(primaryType)` (hex, no prefix).
    pub expected_type_hash: &'static str,
    /// Expected domain separator (hex, no prefix).
    pub expected_domain_separator: &'static str,
    /// Expected signing digest (hex, no prefix).
    pub expected_digest: &'static str,
}

impl TypedDataVector {
    pub fn domain(&self) -> Domain {
        serde_json::from_value(self.domain.clone()).expect("vector domain")
    }

    pub fn types(&self) -> Types {
        serde_json::from_value(self.types.clone()).expect("vector types")
    }

    pub fn message(&self) -> Map<String, Value> {
        serde_json::from_value(self.message.clone()).expect("vector message")
    }

    /// The digest this implementation computes.
    pub fn digest(&self) -> [u8; 32] {
        signing_hash(&self.domain(), &self.types(), self.primary_type, &self.message())
            .expect("vector encodes")
    }
}

/// Get all golden vectors.
pub fn all_vectors() -> Vec<TypedDataVector> {
    vec![
        TypedDataVector {
            name: "Ether Mail",
            domain: json!({
                "name": "Ether Mail",
                "version": "1",
                "chainId": 1,
                "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
            }),
            types: json!({
                "Person": [
                    { "name": "name", "type": "string" },
                    { "name": "wallet", "type": "address" }
                ],
                "Mail": [
                    { "name": "from", "type": "Person" },
                    { "name": "to", "type": "Person" },
                    { "name": "contents", "type": "string" }
                ]
            }),
            primary_type: "Mail",
            message: json!({
                "from": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
                "to": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
                "contents": "Hello, Bob!"
            }),
            expected_type_hash: "a0cedeb2dc280ba39b857546d74f5549c3a1d7bdc2dd96bf881f76108e23dac2",
            expected_domain_separator:
                "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f",
            expected_digest: "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2",
        },
        TypedDataVector {
            name: "SetAlias with salt",
            domain: json!({
                "name": "highlight",
                "version": "0.1.0",
                "chainId": 1,
                "salt": "0x0000000000000000000000000000000000000000000000000000000000000001",
                "verifyingContract": "0x0000000000000000000000000000000000000001"
            }),
            types: json!({
                "SetAlias": [
                    { "name": "from", "type": "address" },
                    { "name": "alias", "type": "address" }
                ]
            }),
            primary_type: "SetAlias",
            message: json!({
                "from": "0xcd2a3d9f938e13cd947ec05abc7fe734df8dd826",
                "alias": "0x00000000000000000000000000000000000000bb"
            }),
            expected_type_hash: "1b6c712e2f70d7fc89b991493de6a1a0aeee31e58bc60c44c449105a77a32081",
            expected_domain_separator:
                "497709b465c9926a4d50b371314245b5e8312acf503f2447d5d86c57b3d049da",
            expected_digest: "82d33f74ea7a4145047964af3655005dcee563e1d054baf14679bd6484180d9b",
        },
    ]
}

/// Verify all golden vectors.
///
/// Returns `(name, matches, digest_hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let types = v.types();
            let type_hash = hex::encode(type_hash(v.primary_type, &types).expect("vector types"));
            let separator = hex::encode(domain_separator(&v.domain()).expect("vector domain"));
            let digest = hex::encode(v.digest());

            let matches = type_hash == v.expected_type_hash
                && separator == v.expected_domain_separator
                && digest == v.expected_digest;

            (v.name.to_string(), matches, digest)
        })
        .collect()
}
