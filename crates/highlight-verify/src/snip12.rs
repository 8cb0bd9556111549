//! SNIP-12 typed-data hashing for Starknet accounts.
//!
//! Revision 0 hashes with Pedersen over a `StarkNetDomain`; revision 1
//! hashes with Poseidon over a `StarknetDomain` that includes the revision
//! itself, quotes names in type encodings and hashes strings as Cairo
//! byte arrays.

use highlight_core::eip712::keccak256;
use highlight_core::{base_type, Domain, NumberOrString, TypedDataError, TypedDataField, Types};
use serde_json::{Map, Value};
use starknet_crypto::{pedersen_hash, poseidon_hash_many};
use starknet_types_core::felt::Felt;

type Result<T> = std::result::Result<T, TypedDataError>;

/// Message prefix committed into every SNIP-12 hash.
pub const MESSAGE_PREFIX: &str = "StarkNet Message";

const SHORTSTRING_MAX: usize = 31;

/// SNIP-12 revision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Revision {
    V0,
    V1,
}

impl Revision {
    /// The revision a domain asks for. Anything other than 1 is legacy.
    pub fn of(domain: &Domain) -> Self {
        match &domain.revision {
            Some(NumberOrString::Number(1)) => Self::V1,
            Some(NumberOrString::String(s)) if s == "1" => Self::V1,
            _ => Self::V0,
        }
    }

    /// Name of the domain struct for this revision.
    pub fn domain_type(self) -> &'static str {
        match self {
            Self::V0 => "StarkNetDomain",
            Self::V1 => "StarknetDomain",
        }
    }

    fn hash_elements(self, elements: &[Felt]) -> Felt {
        match self {
            Self::V0 => {
                let acc = elements
                    .iter()
                    .fold(Felt::ZERO, |acc, element| pedersen_hash(&acc, element));
                pedersen_hash(&acc, &Felt::from(elements.len() as u64))
            }
            Self::V1 => poseidon_hash_many(elements),
        }
    }
}

/// `starknet_keccak`: keccak256 truncated to 250 bits.
pub fn starknet_keccak(data: &[u8]) -> Felt {
    let mut hash = keccak256(data);
    hash[0] &= 0x03;
    Felt::from_bytes_be(&hash)
}

/// Encode an ASCII string of at most 31 characters as a felt.
pub fn shortstring(text: &str) -> Result<Felt> {
    if !text.is_ascii() || text.len() > SHORTSTRING_MAX {
        return Err(TypedDataError::invalid(
            "shortstring",
            format!("{text:?} is not a shortstring"),
        ));
    }
    Ok(Felt::from_bytes_be_slice(text.as_bytes()))
}

/// Parse a felt from hex, decimal or shortstring text.
pub fn felt_from_str(text: &str) -> Result<Felt> {
    if text.starts_with("0x") {
        return Felt::from_hex(text).map_err(|e| TypedDataError::invalid("felt", e.to_string()));
    }
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return Felt::from_dec_str(text).map_err(|e| TypedDataError::invalid("felt", e.to_string()));
    }
    shortstring(text)
}

/// Hash a string as a Cairo `ByteArray`.
pub fn byte_array_hash(text: &str) -> Felt {
    let bytes = text.as_bytes();
    let full = bytes.len() / SHORTSTRING_MAX;
    let pending = &bytes[full * SHORTSTRING_MAX..];

    let mut elements = Vec::with_capacity(full + 3);
    elements.push(Felt::from(full as u64));
    elements.extend(
        bytes[..full * SHORTSTRING_MAX]
            .chunks(SHORTSTRING_MAX)
            .map(Felt::from_bytes_be_slice),
    );
    elements.push(Felt::from_bytes_be_slice(pending));
    elements.push(Felt::from(pending.len() as u64));
    poseidon_hash_many(&elements)
}

/// Encode `primary` and its dependencies, e.g.
/// `Mail(from:felt,to:felt)` or `"Mail"("from":"felt","to":"felt")`.
pub fn encode_type(revision: Revision, primary: &str, types: &Types) -> Result<String> {
    let fields = types
        .get(primary)
        .ok_or_else(|| TypedDataError::UnknownType(primary.to_string()))?;
    let mut out = encode_struct_type(revision, primary, fields);
    for dependency in highlight_core::struct_dependencies(primary, types) {
        if let Some(fields) = types.get(&dependency) {
            out.push_str(&encode_struct_type(revision, &dependency, fields));
        }
    }
    Ok(out)
}

fn encode_struct_type(revision: Revision, name: &str, fields: &[TypedDataField]) -> String {
    let quote = |s: &str| match revision {
        Revision::V0 => s.to_string(),
        Revision::V1 => format!("\"{s}\""),
    };
    let body: Vec<String> = fields
        .iter()
        .map(|field| format!("{}:{}", quote(&field.name), quote(&field.kind)))
        .collect();
    format!("{}({})", quote(name), body.join(","))
}

/// `starknet_keccak` of the type encoding.
pub fn type_hash(revision: Revision, primary: &str, types: &Types) -> Result<Felt> {
    Ok(starknet_keccak(encode_type(revision, primary, types)?.as_bytes()))
}

/// Hash a struct value of type `primary`.
pub fn struct_hash(
    revision: Revision,
    primary: &str,
    types: &Types,
    data: &Map<String, Value>,
) -> Result<Felt> {
    let fields = types
        .get(primary)
        .ok_or_else(|| TypedDataError::UnknownType(primary.to_string()))?;
    let mut elements = Vec::with_capacity(fields.len() + 1);
    elements.push(type_hash(revision, primary, types)?);
    for field in fields {
        let value = data
            .get(&field.name)
            .ok_or_else(|| TypedDataError::MissingField(field.name.clone()))?;
        elements.push(encode_value(revision, &field.kind, value, types)?);
    }
    Ok(revision.hash_elements(&elements))
}

/// The domain struct and values for `domain` at `revision`.
///
/// Field order: name, version, chainId, verifyingContract, salt, revision.
pub fn domain_types(revision: Revision, domain: &Domain) -> (Vec<TypedDataField>, Map<String, Value>) {
    let kind = match revision {
        Revision::V0 => "felt",
        Revision::V1 => "shortstring",
    };
    let mut fields = Vec::new();
    let mut values = Map::new();

    if let Some(name) = &domain.name {
        fields.push(TypedDataField::new("name", kind));
        values.insert("name".into(), Value::String(name.clone()));
    }
    if let Some(version) = &domain.version {
        fields.push(TypedDataField::new("version", kind));
        values.insert("version".into(), Value::String(version.clone()));
    }
    if let Some(chain_id) = &domain.chain_id {
        fields.push(TypedDataField::new("chainId", kind));
        values.insert("chainId".into(), chain_id.to_value());
    }
    // Both are consumed by the ledger, so both are signed over.
    if let Some(contract) = &domain.verifying_contract {
        let kind = if revision == Revision::V1 { "ContractAddress" } else { "felt" };
        fields.push(TypedDataField::new("verifyingContract", kind));
        values.insert("verifyingContract".into(), Value::String(contract.clone()));
    }
    if let Some(salt) = &domain.salt {
        fields.push(TypedDataField::new("salt", "felt"));
        values.insert("salt".into(), salt.to_value());
    }
    if revision == Revision::V1 {
        if let Some(rev) = &domain.revision {
            fields.push(TypedDataField::new("revision", kind));
            values.insert("revision".into(), rev.to_value());
        }
    }
    (fields, values)
}

/// The hash a Starknet account signs for `message` under `domain`.
pub fn message_hash(
    domain: &Domain,
    types: &Types,
    primary: &str,
    message: &Map<String, Value>,
    account: Felt,
) -> Result<Felt> {
    let revision = Revision::of(domain);
    let (domain_fields, domain_values) = domain_types(revision, domain);

    let mut full = types.clone();
    full.insert(revision.domain_type().to_string(), domain_fields);

    let elements = [
        shortstring(MESSAGE_PREFIX)?,
        struct_hash(revision, revision.domain_type(), &full, &domain_values)?,
        account,
        struct_hash(revision, primary, &full, message)?,
    ];
    Ok(revision.hash_elements(&elements))
}

fn encode_value(revision: Revision, kind: &str, value: &Value, types: &Types) -> Result<Felt> {
    if let Some(element) = kind.strip_suffix('*') {
        let items = value
            .as_array()
            .ok_or_else(|| TypedDataError::invalid(kind, "expected an array"))?;
        let encoded = items
            .iter()
            .map(|item| encode_value(revision, element, item, types))
            .collect::<Result<Vec<_>>>()?;
        return Ok(revision.hash_elements(&encoded));
    }

    if types.contains_key(kind) {
        let object = value
            .as_object()
            .ok_or_else(|| TypedDataError::invalid(kind, "expected an object"))?;
        return struct_hash(revision, kind, types, object);
    }

    match kind {
        "felt" | "shortstring" | "ContractAddress" | "ClassHash" | "timestamp" | "u128" => {
            felt_from_value(kind, value)
        }
        "i128" => match value {
            Value::Number(n) => n
                .as_i64()
                .map(Felt::from)
                .ok_or_else(|| TypedDataError::invalid(kind, "out of range")),
            _ => felt_from_value(kind, value),
        },
        "bool" => match value {
            Value::Bool(b) => Ok(Felt::from(*b as u64)),
            Value::String(s) if s == "true" => Ok(Felt::ONE),
            Value::String(s) if s == "false" => Ok(Felt::ZERO),
            _ => felt_from_value(kind, value),
        },
        "string" => match (revision, value) {
            (Revision::V1, Value::String(s)) => Ok(byte_array_hash(s)),
            _ => felt_from_value(kind, value),
        },
        "selector" => match value.as_str() {
            Some(s) if s.starts_with("0x") => felt_from_str(s),
            Some(s) => Ok(starknet_keccak(s.as_bytes())),
            None => Err(TypedDataError::invalid(kind, "expected a string")),
        },
        _ => Err(TypedDataError::UnknownType(base_type(kind).to_string())),
    }
}

pub(crate) fn felt_from_value(kind: &str, value: &Value) -> Result<Felt> {
    match value {
        Value::String(s) => felt_from_str(s),
        Value::Number(n) => n
            .as_u64()
            .map(Felt::from)
            .ok_or_else(|| TypedDataError::invalid(kind, format!("{n} is not a felt"))),
        Value::Bool(b) => Ok(Felt::from(*b as u64)),
        _ => Err(TypedDataError::invalid(kind, "expected a felt")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mail_types() -> Types {
        let mut types = Types::new();
        types.insert(
            "Mail".into(),
            vec![
                TypedDataField::new("from", "ContractAddress"),
                TypedDataField::new("contents", "string"),
                TypedDataField::new("tags", "felt*"),
            ],
        );
        types
    }

    fn domain(revision: Option<u64>) -> Domain {
        Domain {
            name: Some("Highlight".into()),
            version: Some("1".into()),
            chain_id: Some("SN_MAIN".into()),
            revision: revision.map(NumberOrString::Number),
            ..Default::default()
        }
    }

    #[test]
    fn test_shortstring() {
        assert_eq!(shortstring("VALID").unwrap(), Felt::from(0x56414c4944u64));
        assert_eq!(shortstring("").unwrap(), Felt::ZERO);
        assert!(shortstring(&"a".repeat(32)).is_err());
        assert!(shortstring("é").is_err());
    }

    #[test]
    fn test_felt_from_str() {
        assert_eq!(felt_from_str("0x10").unwrap(), Felt::from(16u64));
        assert_eq!(felt_from_str("16").unwrap(), Felt::from(16u64));
        assert_eq!(felt_from_str("SN_MAIN").unwrap(), felt_from_str("0x534e5f4d41494e").unwrap());
    }

    #[test]
    fn test_starknet_keccak_selector() {
        assert_eq!(
            starknet_keccak(b"transfer"),
            Felt::from_hex("0x83afd3f4caedc6eebf44246fe54e38c95e3179a5ec9ea81740eca5b482d12e")
                .unwrap()
        );
    }

    #[test]
    fn test_encode_type_by_revision() {
        let types = mail_types();
        assert_eq!(
            encode_type(Revision::V0, "Mail", &types).unwrap(),
            "Mail(from:ContractAddress,contents:string,tags:felt*)"
        );
        assert_eq!(
            encode_type(Revision::V1, "Mail", &types).unwrap(),
            "\"Mail\"(\"from\":\"ContractAddress\",\"contents\":\"string\",\"tags\":\"felt*\")"
        );
    }

    #[test]
    fn test_revision_detection() {
        assert_eq!(Revision::of(&domain(None)), Revision::V0);
        assert_eq!(Revision::of(&domain(Some(0))), Revision::V0);
        assert_eq!(Revision::of(&domain(Some(1))), Revision::V1);
    }

    #[test]
    fn test_domain_fields_follow_revision() {
        let (v0, _) = domain_types(Revision::V0, &domain(Some(0)));
        assert_eq!(v0.len(), 3);
        assert!(v0.iter().all(|f| f.kind == "felt"));

        let (v1, values) = domain_types(Revision::V1, &domain(Some(1)));
        assert_eq!(v1.last().unwrap().name, "revision");
        assert_eq!(values["revision"], json!(1));
    }

    #[test]
    fn test_byte_array_boundaries() {
        // Exactly one full word leaves an empty pending word.
        let exact = "a".repeat(31);
        let expected = poseidon_hash_many(&[
            Felt::ONE,
            Felt::from_bytes_be_slice(exact.as_bytes()),
            Felt::ZERO,
            Felt::ZERO,
        ]);
        assert_eq!(byte_array_hash(&exact), expected);

        let short = poseidon_hash_many(&[Felt::ZERO, shortstring("hi").unwrap(), Felt::TWO]);
        assert_eq!(byte_array_hash("hi"), short);
    }

    #[test]
    fn test_message_hash_binds_everything() {
        let types = mail_types();
        let message = json!({ "from": "0x1", "contents": "hello", "tags": ["a", "0x2"] });
        let message = message.as_object().unwrap();
        let account = Felt::from(0xabcu64);

        for rev in [0, 1] {
            let d = domain(Some(rev));
            let base = message_hash(&d, &types, "Mail", message, account).unwrap();
            assert_eq!(base, message_hash(&d, &types, "Mail", message, account).unwrap());

            assert_ne!(base, message_hash(&d, &types, "Mail", message, Felt::ONE).unwrap());

            let mut other = message.clone();
            other.insert("contents".into(), json!("bye"));
            assert_ne!(base, message_hash(&d, &types, "Mail", &other, account).unwrap());
        }

        let v0 = message_hash(&domain(Some(0)), &types, "Mail", message, account).unwrap();
        let v1 = message_hash(&domain(Some(1)), &types, "Mail", message, account).unwrap();
        assert_ne!(v0, v1);
    }

    #[test]
    fn test_salt_and_contract_are_signed() {
        let types = mail_types();
        let message = json!({ "from": "0x1", "contents": "hello", "tags": [] });
        let message = message.as_object().unwrap();
        let account = Felt::from(0xabcu64);

        for rev in [0, 1] {
            let mut d = domain(Some(rev));
            d.salt = Some("0x01".into());
            d.verifying_contract = Some("0x03".into());
            let base = message_hash(&d, &types, "Mail", message, account).unwrap();

            let mut other_salt = d.clone();
            other_salt.salt = Some("0x02".into());
            assert_ne!(base, message_hash(&other_salt, &types, "Mail", message, account).unwrap());

            let mut other_contract = d.clone();
            other_contract.verifying_contract = Some("0x09".into());
            assert_ne!(
                base,
                message_hash(&other_contract, &types, "Mail", message, account).unwrap()
            );

            // Same felt, different spelling.
            let mut respelled = d.clone();
            respelled.salt = Some(NumberOrString::Number(1));
            assert_eq!(base, message_hash(&respelled, &types, "Mail", message, account).unwrap());
        }

        let mut d = domain(Some(1));
        d.salt = Some("0x01".into());
        d.verifying_contract = Some("0x03".into());
        let (fields, _) = domain_types(Revision::V1, &d);
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["name", "version", "chainId", "verifyingContract", "salt", "revision"]
        );
    }

    fn person_mail_types(name_kind: &str, contents_kind: &str, tags: bool) -> Types {
        let mut types = Types::new();
        types.insert(
            "Person".into(),
            vec![
                TypedDataField::new("name", name_kind),
                TypedDataField::new("wallet", if tags { "ContractAddress" } else { "felt" }),
            ],
        );
        let mut mail = vec![
            TypedDataField::new("from", "Person"),
            TypedDataField::new("to", "Person"),
            TypedDataField::new("contents", contents_kind),
        ];
        if tags {
            mail.push(TypedDataField::new("tags", "felt*"));
        }
        types.insert("Mail".into(), mail);
        types
    }

    const COW: &str = "0xcd2a3d9f938e13cd947ec05abc7fe734df8dd826";

    #[test]
    fn test_starknet_js_mail_revision_0() {
        let domain = Domain {
            name: Some("StarkNet Mail".into()),
            version: Some("1".into()),
            chain_id: Some(NumberOrString::Number(1)),
            ..Default::default()
        };
        let message = json!({
            "from": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
            "to": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
            "contents": "Hello, Bob!"
        });
        let hash = message_hash(
            &domain,
            &person_mail_types("felt", "felt", false),
            "Mail",
            message.as_object().unwrap(),
            Felt::from_hex(COW).unwrap(),
        )
        .unwrap();
        assert_eq!(
            hash,
            Felt::from_hex("0x6fcff244f63e38b9d88b9e3378d44757710d1b244282b435cb472053c8d78d0")
                .unwrap()
        );
    }

    #[test]
    fn test_mail_revision_1() {
        let domain = Domain {
            name: Some("StarkNet Mail".into()),
            version: Some("1".into()),
            chain_id: Some("SN_MAIN".into()),
            revision: Some(NumberOrString::Number(1)),
            ..Default::default()
        };
        let types = person_mail_types("shortstring", "string", true);
        assert_eq!(
            encode_type(Revision::V1, "Mail", &types).unwrap(),
            "\"Mail\"(\"from\":\"Person\",\"to\":\"Person\",\"contents\":\"string\",\"tags\":\"felt*\")\
             \"Person\"(\"name\":\"shortstring\",\"wallet\":\"ContractAddress\")"
        );

        let message = json!({
            "from": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
            "to": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
            "contents": "Hello, Bob! This sentence is longer than one felt.",
            "tags": ["0x1", "urgent"]
        });
        let hash = message_hash(
            &domain,
            &types,
            "Mail",
            message.as_object().unwrap(),
            Felt::from_hex(COW).unwrap(),
        )
        .unwrap();
        assert_eq!(
            hash,
            Felt::from_hex("0x2ed4c6078ccc097b4081a0c7074dd1acd44479f80ba40860ed00bec15b93943")
                .unwrap()
        );
    }

    #[test]
    fn test_unknown_field_type() {
        let mut types = Types::new();
        types.insert("Bad".into(), vec![TypedDataField::new("x", "u256")]);
        let message = json!({ "x": "1" });
        assert_eq!(
            message_hash(&domain(Some(1)), &types, "Bad", message.as_object().unwrap(), Felt::ONE),
            Err(TypedDataError::UnknownType("u256".into()))
        );
    }

    #[test]
    fn test_missing_field() {
        let message = json!({ "from": "0x1" });
        assert_eq!(
            message_hash(
                &domain(Some(1)),
                &mail_types(),
                "Mail",
                message.as_object().unwrap(),
                Felt::ONE
            ),
            Err(TypedDataError::MissingField("contents".into()))
        );
    }
}
