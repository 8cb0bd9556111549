//! EIP-712 typed structured data hashing.
//!
//! Implements `encodeType`, `hashStruct` and the final signing digest
//! `keccak256(0x1901 || domainSeparator || hashStruct(message))`.
//!
//! Values are JSON: integers may be JSON numbers or decimal/hex strings,
//! byte strings are `0x`-prefixed hex.

use serde_json::{Map, Value};
use sha3::{Digest, Keccak256};

use crate::error::{Result, TypedDataError};
use crate::typed_data::{struct_dependencies, TypedDataField, Types};
use crate::types::{Domain, NumberOrString};

/// Name of the EIP-712 domain struct.
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Encode a struct type with its dependencies, e.g.
/// `Mail(Person from,Person to,string contents)Person(string name,address wallet)`.
pub fn encode_type(primary: &str, types: &Types) -> Result<String> {
    let fields = types
        .get(primary)
        .ok_or_else(|| TypedDataError::UnknownType(primary.to_string()))?;

    let mut encoded = format_struct(primary, fields);
    for dep in struct_dependencies(primary, types) {
        encoded.push_str(&format_struct(&dep, &types[&dep]));
    }
    Ok(encoded)
}

fn format_struct(name: &str, fields: &[TypedDataField]) -> String {
    let body: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.kind, f.name))
        .collect();
    format!("{}({})", name, body.join(","))
}

/// `keccak256(encodeType(primary))`.
pub fn type_hash(primary: &str, types: &Types) -> Result<[u8; 32]> {
    Ok(keccak256(encode_type(primary, types)?.as_bytes()))
}

/// `keccak256(typeHash || encodeData(data))`.
pub fn hash_struct(primary: &str, types: &Types, data: &Map<String, Value>) -> Result<[u8; 32]> {
    let fields = types
        .get(primary)
        .ok_or_else(|| TypedDataError::UnknownType(primary.to_string()))?;

    let mut buf = Vec::with_capacity(32 * (fields.len() + 1));
    buf.extend_from_slice(&type_hash(primary, types)?);
    for field in fields {
        let value = data
            .get(&field.name)
            .ok_or_else(|| TypedDataError::MissingField(field.name.clone()))?;
        buf.extend_from_slice(&encode_field(&field.kind, value, types)?);
    }
    Ok(keccak256(&buf))
}

/// The domain type and values for the fields present in `domain`.
///
/// Field order is fixed: name, version, chainId, verifyingContract, salt.
pub fn domain_types(domain: &Domain) -> (Types, Map<String, Value>) {
    let mut fields = Vec::new();
    let mut values = Map::new();

    if let Some(name) = &domain.name {
        fields.push(TypedDataField::new("name", "string"));
        values.insert("name".into(), Value::String(name.clone()));
    }
    if let Some(version) = &domain.version {
        fields.push(TypedDataField::new("version", "string"));
        values.insert("version".into(), Value::String(version.clone()));
    }
    if let Some(chain_id) = &domain.chain_id {
        fields.push(TypedDataField::new("chainId", "uint256"));
        values.insert("chainId".into(), chain_id.to_value());
    }
    if let Some(contract) = &domain.verifying_contract {
        fields.push(TypedDataField::new("verifyingContract", "address"));
        values.insert("verifyingContract".into(), Value::String(contract.clone()));
    }
    if let Some(salt) = &domain.salt {
        fields.push(TypedDataField::new("salt", "bytes32"));
        values.insert("salt".into(), salt.to_value());
    }

    let mut types = Types::new();
    types.insert(DOMAIN_TYPE.to_string(), fields);
    (types, values)
}

/// `hashStruct(eip712Domain)`.
pub fn domain_separator(domain: &Domain) -> Result<[u8; 32]> {
    let (types, values) = domain_types(domain);
    hash_struct(DOMAIN_TYPE, &types, &values)
}

/// The digest an EVM wallet signs for `eth_signTypedData_v4`.
pub fn signing_hash(
    domain: &Domain,
    types: &Types,
    primary: &str,
    message: &Map<String, Value>,
) -> Result<[u8; 32]> {
    let mut buf = Vec::with_capacity(66);
    buf.extend_from_slice(&[0x19, 0x01]);
    buf.extend_from_slice(&domain_separator(domain)?);
    buf.extend_from_slice(&hash_struct(primary, types, message)?);
    Ok(keccak256(&buf))
}

fn encode_field(kind: &str, value: &Value, types: &Types) -> Result<[u8; 32]> {
    if let Some(open) = kind.strip_suffix(']').and_then(|k| k.rfind('[')) {
        let element = &kind[..open];
        let length = &kind[open + 1..kind.len() - 1];
        let items = value
            .as_array()
            .ok_or_else(|| TypedDataError::invalid(kind, "expected array"))?;
        if !length.is_empty() {
            let expected: usize = length
                .parse()
                .map_err(|_| TypedDataError::UnknownType(kind.to_string()))?;
            if items.len() != expected {
                return Err(TypedDataError::invalid(
                    kind,
                    format!("expected {expected} items, got {}", items.len()),
                ));
            }
        }
        let mut buf = Vec::with_capacity(32 * items.len());
        for item in items {
            buf.extend_from_slice(&encode_field(element, item, types)?);
        }
        return Ok(keccak256(&buf));
    }

    if types.contains_key(kind) {
        let object = value
            .as_object()
            .ok_or_else(|| TypedDataError::invalid(kind, "expected object"))?;
        return hash_struct(kind, types, object);
    }

    match kind {
        "string" => {
            let s = value
                .as_str()
                .ok_or_else(|| TypedDataError::invalid(kind, "expected string"))?;
            Ok(keccak256(s.as_bytes()))
        }
        "bytes" => Ok(keccak256(&decode_hex(kind, value)?)),
        "bool" => {
            let flag = match value {
                Value::Bool(b) => *b,
                Value::Number(n) if n.as_u64() == Some(0) => false,
                Value::Number(n) if n.as_u64() == Some(1) => true,
                _ => return Err(TypedDataError::invalid(kind, "expected boolean")),
            };
            let mut word = [0u8; 32];
            word[31] = u8::from(flag);
            Ok(word)
        }
        "address" => {
            let bytes = decode_hex(kind, value)?;
            if bytes.len() != 20 {
                return Err(TypedDataError::invalid(kind, "expected 20 bytes"));
            }
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(&bytes);
            Ok(word)
        }
        _ => {
            if let Some(size) = kind.strip_prefix("bytes") {
                return encode_fixed_bytes(kind, size, value);
            }
            if let Some(bits) = kind.strip_prefix("uint") {
                return encode_integer(kind, parse_bits(kind, bits)?, false, value);
            }
            if let Some(bits) = kind.strip_prefix("int") {
                return encode_integer(kind, parse_bits(kind, bits)?, true, value);
            }
            Err(TypedDataError::UnknownType(kind.to_string()))
        }
    }
}

/// The `bytes32` word a domain salt encodes to.
///
/// Every spelling of a salt that signs identically (hex case, `0X`, a JSON
/// integer) maps to the same word.
pub fn salt_word(salt: &NumberOrString) -> Result<[u8; 32]> {
    encode_fixed_bytes("bytes32", "32", &salt.to_value())
}

fn encode_fixed_bytes(kind: &str, size: &str, value: &Value) -> Result<[u8; 32]> {
    let size: usize = size
        .parse()
        .ok()
        .filter(|n| (1..=32).contains(n))
        .ok_or_else(|| TypedDataError::UnknownType(kind.to_string()))?;

    // Domain salts are also accepted as plain integers.
    let bytes = match value {
        Value::Number(_) => integer_word(kind, value)?.1.to_vec(),
        _ => decode_hex(kind, value)?,
    };
    if bytes.len() != size {
        return Err(TypedDataError::invalid(
            kind,
            format!("expected {size} bytes, got {}", bytes.len()),
        ));
    }
    let mut word = [0u8; 32];
    word[..size].copy_from_slice(&bytes);
    Ok(word)
}

fn parse_bits(kind: &str, bits: &str) -> Result<u32> {
    let bits = if bits.is_empty() { 256 } else {
        bits.parse()
            .map_err(|_| TypedDataError::UnknownType(kind.to_string()))?
    };
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(TypedDataError::UnknownType(kind.to_string()));
    }
    Ok(bits)
}

fn encode_integer(kind: &str, bits: u32, signed: bool, value: &Value) -> Result<[u8; 32]> {
    let (negative, magnitude) = integer_word(kind, value)?;

    if !negative {
        let limit = if signed { bits - 1 } else { bits };
        if bit_length(&magnitude) > limit {
            return Err(TypedDataError::invalid(kind, "value out of range"));
        }
        return Ok(magnitude);
    }

    if !signed {
        return Err(TypedDataError::invalid(kind, "negative value for unsigned type"));
    }
    // Two's complement: -m == !(m - 1)
    let reduced = decrement(&magnitude);
    if bit_length(&reduced) > bits - 1 {
        return Err(TypedDataError::invalid(kind, "value out of range"));
    }
    Ok(reduced.map(|b| !b))
}

/// Parse a JSON integer into a sign and a 256-bit big-endian magnitude.
fn integer_word(kind: &str, value: &Value) -> Result<(bool, [u8; 32])> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok((false, u256_from_u128(u128::from(u))))
            } else if let Some(i) = n.as_i64() {
                Ok((i < 0, u256_from_u128(u128::from(i.unsigned_abs()))))
            } else {
                Err(TypedDataError::invalid(kind, "expected integer"))
            }
        }
        Value::String(s) => {
            let s = s.trim();
            let (negative, digits) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s),
            };
            let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
                Some(hex_digits) => parse_hex_word(kind, hex_digits)?,
                None => parse_decimal_word(kind, digits)?,
            };
            let is_zero = magnitude.iter().all(|b| *b == 0);
            Ok((negative && !is_zero, magnitude))
        }
        _ => Err(TypedDataError::invalid(kind, "expected integer")),
    }
}

fn u256_from_u128(n: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&n.to_be_bytes());
    word
}

fn parse_hex_word(kind: &str, digits: &str) -> Result<[u8; 32]> {
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(&padded).map_err(|e| TypedDataError::invalid(kind, e.to_string()))?;
    let significant: Vec<u8> = bytes.into_iter().skip_while(|b| *b == 0).collect();
    if significant.len() > 32 {
        return Err(TypedDataError::invalid(kind, "value exceeds 256 bits"));
    }
    let mut word = [0u8; 32];
    word[32 - significant.len()..].copy_from_slice(&significant);
    Ok(word)
}

fn parse_decimal_word(kind: &str, digits: &str) -> Result<[u8; 32]> {
    if digits.is_empty() {
        return Err(TypedDataError::invalid(kind, "empty integer"));
    }
    let mut word = [0u8; 32];
    for c in digits.chars() {
        let digit = c
            .to_digit(10)
            .ok_or_else(|| TypedDataError::invalid(kind, format!("invalid digit {c:?}")))?;
        // word = word * 10 + digit
        let mut carry = digit;
        for byte in word.iter_mut().rev() {
            let acc = u32::from(*byte) * 10 + carry;
            *byte = (acc & 0xff) as u8;
            carry = acc >> 8;
        }
        if carry != 0 {
            return Err(TypedDataError::invalid(kind, "value exceeds 256 bits"));
        }
    }
    Ok(word)
}

fn bit_length(word: &[u8; 32]) -> u32 {
    match word.iter().position(|b| *b != 0) {
        Some(idx) => (31 - idx as u32) * 8 + (8 - word[idx].leading_zeros()),
        None => 0,
    }
}

fn decrement(word: &[u8; 32]) -> [u8; 32] {
    let mut out = *word;
    for byte in out.iter_mut().rev() {
        let (value, borrow) = byte.overflowing_sub(1);
        *byte = value;
        if !borrow {
            break;
        }
    }
    out
}

fn decode_hex(kind: &str, value: &Value) -> Result<Vec<u8>> {
    let s = value
        .as_str()
        .ok_or_else(|| TypedDataError::invalid(kind, "expected hex string"))?;
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| TypedDataError::invalid(kind, "missing 0x prefix"))?;
    hex::decode(digits).map_err(|e| TypedDataError::invalid(kind, e.to_string()))
}
