//! Proptest generators for property-based testing.

use proptest::prelude::*;

use highlight_core::{TypedDataField, Types};

use crate::fixtures::TestWallet;

/// A random 32-byte hex salt.
pub fn salt() -> impl Strategy<Value = String> {
    any::<[u8; 32]>().prop_map(|bytes| format!("0x{}", hex::encode(bytes)))
}

/// `n` distinct salts.
pub fn distinct_salts(n: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(salt(), n).prop_map(|set| set.into_iter().collect())
}

/// A random lowercase 20-byte address.
pub fn address() -> impl Strategy<Value = String> {
    any::<[u8; 20]>().prop_map(|bytes| format!("0x{}", hex::encode(bytes)))
}

/// A deterministic wallet from a random seed.
pub fn wallet() -> impl Strategy<Value = TestWallet> {
    any::<[u8; 16]>().prop_map(|seed| TestWallet::from_seed(&seed))
}

/// A primitive EIP-712 field type.
pub fn primitive_type() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("address"),
        Just("bool"),
        Just("string"),
        Just("bytes"),
        Just("bytes32"),
        Just("uint256"),
        Just("int64"),
    ]
}

/// A schema shaped as a tree rooted at `T0`.
///
/// Every type `Tk` (k > 0) is referenced by exactly one lower-numbered
/// parent, so `T0` is always the primary type.
pub fn tree_schema(max_types: usize) -> impl Strategy<Value = Types> {
    (1..=max_types.max(1))
        .prop_flat_map(|n| {
            let parents: Vec<BoxedStrategy<usize>> =
                (1..n).map(|k| (0..k).boxed()).collect();
            (Just(n), parents, prop::collection::vec(primitive_type(), n))
        })
        .prop_map(|(n, parents, leaves)| {
            let mut types = Types::new();
            for (k, leaf) in leaves.iter().enumerate().take(n) {
                types.insert(format!("T{k}"), vec![TypedDataField::new("value", *leaf)]);
            }
            for (offset, parent) in parents.into_iter().enumerate() {
                let child = offset + 1;
                if let Some(fields) = types.get_mut(&format!("T{parent}")) {
                    fields.push(TypedDataField::new(format!("child{child}"), format!("T{child}")));
                }
            }
            types
        })
}
