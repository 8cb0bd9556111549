//! Typed-data schemas and primary-type derivation.
//!
//! A schema is a map `{typeName -> fields}`. The primary type is the one
//! struct that no other struct references; every other struct must be
//! reachable from it. Agents register their entrypoints by schema, so the
//! primary type doubles as the entrypoint name.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypedDataError};

/// Domain types that never take part in primary-type derivation.
pub const DOMAIN_TYPES: [&str; 3] = ["EIP712Domain", "StarknetDomain", "StarkNetDomain"];

/// A single `{name, type}` field of a struct type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypedDataField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedDataField {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// A typed-data schema, ordered by type name.
pub type Types = BTreeMap<String, Vec<TypedDataField>>;

/// Strip array suffixes (`[]`, `[n]`, `*`) from a field type.
pub fn base_type(kind: &str) -> &str {
    let mut base = kind.trim_end_matches('*');
    while base.ends_with(']') {
        match base.rfind('[') {
            Some(idx) => base = &base[..idx],
            None => break,
        }
    }
    base
}

fn is_domain_type(name: &str) -> bool {
    DOMAIN_TYPES.contains(&name)
}

/// Derive the primary type of a schema.
///
/// Builds the parent links between struct types, picks the single type
/// with no parents, then walks its dependency graph rejecting cycles.
pub fn primary_type(types: &Types) -> Result<String> {
    let mut parents: BTreeMap<&str, BTreeSet<&str>> = types
        .keys()
        .filter(|name| !is_domain_type(name))
        .map(|name| (name.as_str(), BTreeSet::new()))
        .collect();
    let mut links: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for (name, fields) in types.iter().filter(|(name, _)| !is_domain_type(name)) {
        let children = links.entry(name.as_str()).or_default();
        for field in fields {
            let base = base_type(&field.kind);
            if base == name {
                return Err(TypedDataError::CircularReference(name.clone()));
            }
            if let Some(p) = parents.get_mut(base) {
                p.insert(name.as_str());
                children.insert(base);
            }
        }
    }

    let roots: Vec<&str> = parents
        .iter()
        .filter(|(_, p)| p.is_empty())
        .map(|(name, _)| *name)
        .collect();

    let primary = match roots.as_slice() {
        [] => return Err(TypedDataError::MissingPrimaryType),
        [one] => *one,
        many => {
            return Err(TypedDataError::AmbiguousPrimaryType(
                many.iter().map(|s| s.to_string()).collect(),
            ))
        }
    };

    check_circular(primary, &links, &mut BTreeSet::new())?;
    Ok(primary.to_string())
}

fn check_circular<'a>(
    name: &'a str,
    links: &BTreeMap<&'a str, BTreeSet<&'a str>>,
    path: &mut BTreeSet<&'a str>,
) -> Result<()> {
    if !path.insert(name) {
        return Err(TypedDataError::CircularReference(name.to_string()));
    }
    if let Some(children) = links.get(name) {
        for child in children {
            check_circular(*child, links, path)?;
        }
    }
    path.remove(name);
    Ok(())
}

/// Every struct type reachable from `primary`, excluding `primary` itself.
pub fn struct_dependencies(primary: &str, types: &Types) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    collect_dependencies(primary, types, &mut found);
    found.remove(primary);
    found
}

fn collect_dependencies(name: &str, types: &Types, found: &mut BTreeSet<String>) {
    if found.contains(name) {
        return;
    }
    let Some(fields) = types.get(name) else {
        return;
    };
    found.insert(name.to_string());
    for field in fields {
        let base = base_type(&field.kind);
        if types.contains_key(base) {
            collect_dependencies(base, types, found);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(entries: &[(&str, &[(&str, &str)])]) -> Types {
        entries
            .iter()
            .map(|(name, fields)| {
                (
                    name.to_string(),
                    fields
                        .iter()
                        .map(|(n, k)| TypedDataField::new(*n, *k))
                        .collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_single_struct_is_primary() {
        let types = schema(&[("SetAlias", &[("from", "address"), ("alias", "address")])]);
        assert_eq!(primary_type(&types).unwrap(), "SetAlias");
    }

    #[test]
    fn test_unreferenced_struct_is_primary() {
        let types = schema(&[
            ("Person", &[("name", "string"), ("wallet", "address")]),
            ("Mail", &[("from", "Person"), ("to", "Person[]"), ("contents", "string")]),
        ]);
        assert_eq!(primary_type(&types).unwrap(), "Mail");
    }

    #[test]
    fn test_domain_types_are_ignored() {
        let types = schema(&[
            ("EIP712Domain", &[("name", "string")]),
            ("StarknetDomain", &[("name", "shortstring")]),
            ("Vote", &[("choice", "felt"), ("options", "Option*")]),
            ("Option", &[("label", "shortstring")]),
        ]);
        assert_eq!(primary_type(&types).unwrap(), "Vote");
    }

    #[test]
    fn test_ambiguous_primary() {
        let types = schema(&[("A", &[("x", "uint256")]), ("B", &[("y", "uint256")])]);
        assert_eq!(
            primary_type(&types),
            Err(TypedDataError::AmbiguousPrimaryType(vec!["A".into(), "B".into()]))
        );
    }

    #[test]
    fn test_self_reference_rejected() {
        let types = schema(&[("Node", &[("next", "Node[]")])]);
        assert_eq!(
            primary_type(&types),
            Err(TypedDataError::CircularReference("Node".into()))
        );
    }

    #[test]
    fn test_cycle_without_root() {
        let types = schema(&[("A", &[("b", "B")]), ("B", &[("a", "A")])]);
        assert_eq!(primary_type(&types), Err(TypedDataError::MissingPrimaryType));
    }

    #[test]
    fn test_cycle_below_root() {
        let types = schema(&[
            ("Root", &[("a", "A")]),
            ("A", &[("b", "B")]),
            ("B", &[("a", "A")]),
        ]);
        assert!(matches!(
            primary_type(&types),
            Err(TypedDataError::CircularReference(_))
        ));
    }

    #[test]
    fn test_base_type() {
        assert_eq!(base_type("uint256"), "uint256");
        assert_eq!(base_type("Person[]"), "Person");
        assert_eq!(base_type("Person[2][]"), "Person");
        assert_eq!(base_type("felt*"), "felt");
    }

    #[test]
    fn test_struct_dependencies() {
        let types = schema(&[
            ("Person", &[("name", "string")]),
            ("Group", &[("members", "Person[]")]),
            ("Mail", &[("from", "Person"), ("group", "Group")]),
        ]);
        let deps: Vec<String> = struct_dependencies("Mail", &types).into_iter().collect();
        assert_eq!(deps, vec!["Group".to_string(), "Person".to_string()]);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn chain_schema_root_is_primary(len in 1usize..8) {
                // T0 -> T1 -> ... -> T{len-1}
                let mut types = Types::new();
                for i in 0..len {
                    let mut fields = vec![TypedDataField::new("value", "uint256")];
                    if i + 1 < len {
                        fields.push(TypedDataField::new("next", format!("T{}", i + 1)));
                    }
                    types.insert(format!("T{i}"), fields);
                }
                prop_assert_eq!(primary_type(&types).unwrap(), "T0");
            }
        }
    }
}
