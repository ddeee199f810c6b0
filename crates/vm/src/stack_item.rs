//! Tagged stack items and their conversions.
//!
//! Arrays and maps have reference semantics: duplicating one on the stack
//! aliases the same backing storage. Structs are the exception, they are
//! deep-copied whenever they are stored into a compound item, which is what
//! gives them value semantics.

use crate::{VmError, VmResult, MAX_ARRAY_SIZE, MAX_BIGINT_BYTES, MAX_ITEM_SIZE};
use neo_io::{BinaryWriter, Error as IoError, MemoryReader};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Serialization type tags for stack items.
const TAG_BYTE_ARRAY: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INTEGER: u8 = 0x02;
const TAG_ARRAY: u8 = 0x80;
const TAG_STRUCT: u8 = 0x81;
const TAG_MAP: u8 = 0x82;

/// A key of a VM map: only primitive items may key a map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MapKey {
    Bool(bool),
    Integer(BigInt),
    Bytes(Vec<u8>),
}

impl MapKey {
    /// Converts a stack item into a map key, rejecting compound items.
    pub fn from_item(item: &StackItem) -> VmResult<Self> {
        match item {
            StackItem::Bool(b) => Ok(MapKey::Bool(*b)),
            StackItem::Integer(i) => Ok(MapKey::Integer(i.clone())),
            StackItem::ByteArray(b) => Ok(MapKey::Bytes(b.clone())),
            other => Err(VmError::InvalidConversion(format!(
                "{} cannot be a map key",
                other.type_name()
            ))),
        }
    }

    /// Converts the key back into a stack item.
    pub fn to_item(&self) -> StackItem {
        match self {
            MapKey::Bool(b) => StackItem::Bool(*b),
            MapKey::Integer(i) => StackItem::Integer(i.clone()),
            MapKey::Bytes(b) => StackItem::ByteArray(b.clone()),
        }
    }
}

/// An opaque host object held on the stack.
pub type InteropValue = Rc<RefCell<Box<dyn Any>>>;

/// A single item on the evaluation stack.
#[derive(Clone)]
pub enum StackItem {
    Bool(bool),
    Integer(BigInt),
    ByteArray(Vec<u8>),
    Array(Rc<RefCell<Vec<StackItem>>>),
    Struct(Rc<RefCell<Vec<StackItem>>>),
    Map(Rc<RefCell<BTreeMap<MapKey, StackItem>>>),
    Interop(InteropValue),
}

impl StackItem {
    /// An integer item from anything convertible to `BigInt`.
    pub fn integer<T: Into<BigInt>>(value: T) -> Self {
        StackItem::Integer(value.into())
    }

    /// A byte-array item.
    pub fn byte_array<T: Into<Vec<u8>>>(value: T) -> Self {
        StackItem::ByteArray(value.into())
    }

    /// A fresh array item owning `items`.
    pub fn array(items: Vec<StackItem>) -> Self {
        StackItem::Array(Rc::new(RefCell::new(items)))
    }

    /// A fresh struct item owning `items`.
    pub fn struct_item(items: Vec<StackItem>) -> Self {
        StackItem::Struct(Rc::new(RefCell::new(items)))
    }

    /// A fresh empty map item.
    pub fn map() -> Self {
        StackItem::Map(Rc::new(RefCell::new(BTreeMap::new())))
    }

    /// An interop item wrapping a host object.
    pub fn interop<T: Any>(value: T) -> Self {
        StackItem::Interop(Rc::new(RefCell::new(Box::new(value))))
    }

    /// The human-readable type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            StackItem::Bool(_) => "Boolean",
            StackItem::Integer(_) => "Integer",
            StackItem::ByteArray(_) => "ByteArray",
            StackItem::Array(_) => "Array",
            StackItem::Struct(_) => "Struct",
            StackItem::Map(_) => "Map",
            StackItem::Interop(_) => "InteropInterface",
        }
    }

    /// Truthiness: booleans by value, integers by sign, byte arrays by any
    /// non-zero byte; compound and interop items are always true.
    pub fn to_bool(&self) -> bool {
        match self {
            StackItem::Bool(b) => *b,
            StackItem::Integer(i) => !i.is_zero(),
            StackItem::ByteArray(b) => b.iter().any(|&x| x != 0),
            StackItem::Array(_) | StackItem::Struct(_) | StackItem::Map(_)
            | StackItem::Interop(_) => true,
        }
    }

    /// Converts to an integer; fails for compound and interop items, and
    /// for byte arrays wider than the integer cap.
    pub fn to_bigint(&self) -> VmResult<BigInt> {
        match self {
            StackItem::Bool(b) => Ok(BigInt::from(u8::from(*b))),
            StackItem::Integer(i) => Ok(i.clone()),
            StackItem::ByteArray(b) => {
                if b.len() > MAX_BIGINT_BYTES {
                    return Err(VmError::IntegerTooWide);
                }
                Ok(bytes_to_bigint(b))
            }
            other => Err(VmError::InvalidConversion(format!(
                "cannot convert {} to Integer",
                other.type_name()
            ))),
        }
    }

    /// Converts to bytes; fails for compound and interop items.
    pub fn to_bytes(&self) -> VmResult<Vec<u8>> {
        match self {
            StackItem::Bool(b) => Ok(vec![u8::from(*b)]),
            StackItem::Integer(i) => Ok(bigint_to_bytes(i)),
            StackItem::ByteArray(b) => Ok(b.clone()),
            other => Err(VmError::InvalidConversion(format!(
                "cannot convert {} to ByteArray",
                other.type_name()
            ))),
        }
    }

    /// Borrows the backing vector of an array or struct.
    pub fn as_compound(&self) -> VmResult<&Rc<RefCell<Vec<StackItem>>>> {
        match self {
            StackItem::Array(items) | StackItem::Struct(items) => Ok(items),
            other => Err(VmError::InvalidConversion(format!(
                "cannot convert {} to Array",
                other.type_name()
            ))),
        }
    }

    /// Copies the elements of an array or struct out.
    pub fn to_vec(&self) -> VmResult<Vec<StackItem>> {
        Ok(self.as_compound()?.borrow().clone())
    }

    /// The value stored for assignment into a compound item: structs are
    /// deep-copied, everything else keeps its (reference) identity.
    pub fn clone_for_assignment(&self) -> StackItem {
        match self {
            StackItem::Struct(items) => {
                let copied = items
                    .borrow()
                    .iter()
                    .map(StackItem::clone_for_assignment)
                    .collect();
                StackItem::struct_item(copied)
            }
            other => other.clone(),
        }
    }

    /// Item equality as tested by the `EQUAL` opcode: primitives compare by
    /// their byte representation, structs recursively by value, arrays,
    /// maps and interop items by identity.
    pub fn equals(&self, other: &StackItem) -> bool {
        match (self, other) {
            (StackItem::Array(a), StackItem::Array(b)) => Rc::ptr_eq(a, b),
            (StackItem::Map(a), StackItem::Map(b)) => Rc::ptr_eq(a, b),
            (StackItem::Interop(a), StackItem::Interop(b)) => Rc::ptr_eq(a, b),
            (StackItem::Struct(a), StackItem::Struct(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (a, b) => match (a.to_bytes(), b.to_bytes()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Debug for StackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackItem::Bool(b) => write!(f, "Bool({b})"),
            StackItem::Integer(i) => write!(f, "Integer({i})"),
            StackItem::ByteArray(b) => write!(f, "ByteArray(0x{})", hex::encode(b)),
            StackItem::Array(items) => write!(f, "Array({:?})", items.borrow()),
            StackItem::Struct(items) => write!(f, "Struct({:?})", items.borrow()),
            StackItem::Map(map) => write!(f, "Map({} entries)", map.borrow().len()),
            StackItem::Interop(_) => write!(f, "InteropInterface"),
        }
    }
}

/// Decodes the VM's little-endian two's-complement integer format.
pub fn bytes_to_bigint(bytes: &[u8]) -> BigInt {
    if bytes.is_empty() {
        return BigInt::zero();
    }
    BigInt::from_signed_bytes_le(bytes)
}

/// Encodes an integer in the VM's minimal little-endian two's-complement
/// format; zero is the empty byte string.
pub fn bigint_to_bytes(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        return Vec::new();
    }
    value.to_signed_bytes_le()
}

/// Serializes a stack item for `Runtime.Serialize` and execution results.
/// Interop items cannot be serialized and fault the writer.
pub fn serialize_item(item: &StackItem, writer: &mut BinaryWriter) {
    match item {
        StackItem::ByteArray(bytes) => {
            writer.write_u8(TAG_BYTE_ARRAY);
            writer.write_var_bytes(bytes);
        }
        StackItem::Bool(b) => {
            writer.write_u8(TAG_BOOL);
            writer.write_bool(*b);
        }
        StackItem::Integer(i) => {
            writer.write_u8(TAG_INTEGER);
            writer.write_var_bytes(&bigint_to_bytes(i));
        }
        StackItem::Array(items) | StackItem::Struct(items) => {
            writer.write_u8(if matches!(item, StackItem::Array(_)) {
                TAG_ARRAY
            } else {
                TAG_STRUCT
            });
            let items = items.borrow();
            writer.write_var_uint(items.len() as u64);
            for element in items.iter() {
                serialize_item(element, writer);
            }
        }
        StackItem::Map(map) => {
            writer.write_u8(TAG_MAP);
            let map = map.borrow();
            writer.write_var_uint(map.len() as u64);
            for (key, value) in map.iter() {
                serialize_item(&key.to_item(), writer);
                serialize_item(value, writer);
            }
        }
        StackItem::Interop(_) => {
            writer.fault(IoError::InvalidFormat(
                "interop items are not serializable".into(),
            ));
        }
    }
}

/// Deserializes a stack item previously written by [`serialize_item`].
pub fn deserialize_item(reader: &mut MemoryReader) -> StackItem {
    let tag = reader.read_u8();
    match tag {
        TAG_BYTE_ARRAY => StackItem::ByteArray(reader.read_var_bytes(MAX_ITEM_SIZE)),
        TAG_BOOL => StackItem::Bool(reader.read_bool()),
        TAG_INTEGER => {
            let bytes = reader.read_var_bytes(MAX_BIGINT_BYTES);
            StackItem::Integer(bytes_to_bigint(&bytes))
        }
        TAG_ARRAY | TAG_STRUCT => {
            let count = reader.read_var_uint(MAX_ARRAY_SIZE as u64) as usize;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                if reader.error().is_some() {
                    break;
                }
                items.push(deserialize_item(reader));
            }
            if tag == TAG_ARRAY {
                StackItem::array(items)
            } else {
                StackItem::struct_item(items)
            }
        }
        TAG_MAP => {
            let count = reader.read_var_uint(MAX_ARRAY_SIZE as u64) as usize;
            let mut map = BTreeMap::new();
            for _ in 0..count {
                if reader.error().is_some() {
                    break;
                }
                let key_item = deserialize_item(reader);
                let value = deserialize_item(reader);
                match MapKey::from_item(&key_item) {
                    Ok(key) => {
                        map.insert(key, value);
                    }
                    Err(err) => {
                        reader.fault(IoError::InvalidFormat(err.to_string()));
                        break;
                    }
                }
            }
            StackItem::Map(Rc::new(RefCell::new(map)))
        }
        other => {
            reader.fault(IoError::InvalidFormat(format!(
                "unknown stack item tag {other:#04x}"
            )));
            StackItem::Bool(false)
        }
    }
}

/// Converts an integer to `i64`, faulting on overflow.
pub fn bigint_to_i64(value: &BigInt) -> VmResult<i64> {
    value
        .to_i64()
        .ok_or_else(|| VmError::InvalidConversion("integer does not fit in 64 bits".into()))
}

/// Returns the absolute width in bytes of an integer, for limit checks.
pub fn bigint_width(value: &BigInt) -> usize {
    if value.is_zero() {
        0
    } else {
        (value.abs().bits() as usize) / 8 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_the_rules() {
        assert!(!StackItem::Bool(false).to_bool());
        assert!(StackItem::integer(5).to_bool());
        assert!(!StackItem::integer(0).to_bool());
        assert!(!StackItem::byte_array(vec![0, 0]).to_bool());
        assert!(StackItem::byte_array(vec![0, 1]).to_bool());
        assert!(StackItem::array(vec![]).to_bool());
        assert!(StackItem::map().to_bool());
    }

    #[test]
    fn integer_bytes_round_trip() {
        for value in [0i64, 1, -1, 127, 128, -128, 255, 256, i64::MAX, i64::MIN] {
            let big = BigInt::from(value);
            assert_eq!(bytes_to_bigint(&bigint_to_bytes(&big)), big, "{value}");
        }
        assert!(bigint_to_bytes(&BigInt::zero()).is_empty());
    }

    #[test]
    fn struct_equality_is_by_value_array_by_identity() {
        let a = StackItem::struct_item(vec![StackItem::integer(1)]);
        let b = StackItem::struct_item(vec![StackItem::integer(1)]);
        assert!(a.equals(&b));

        let x = StackItem::array(vec![StackItem::integer(1)]);
        let y = StackItem::array(vec![StackItem::integer(1)]);
        assert!(!x.equals(&y));
        assert!(x.equals(&x.clone()));
    }

    #[test]
    fn struct_assignment_copies_arrays_alias() {
        let original = StackItem::struct_item(vec![StackItem::integer(1)]);
        let copy = original.clone_for_assignment();
        if let (StackItem::Struct(a), StackItem::Struct(b)) = (&original, &copy) {
            assert!(!Rc::ptr_eq(a, b));
        } else {
            panic!("expected structs");
        }

        let array = StackItem::array(vec![StackItem::integer(1)]);
        let alias = array.clone_for_assignment();
        if let (StackItem::Array(a), StackItem::Array(b)) = (&array, &alias) {
            assert!(Rc::ptr_eq(a, b));
        } else {
            panic!("expected arrays");
        }
    }

    #[test]
    fn item_serialization_round_trip() {
        let map = StackItem::map();
        if let StackItem::Map(m) = &map {
            m.borrow_mut()
                .insert(MapKey::Bytes(b"key".to_vec()), StackItem::integer(42));
        }
        let item = StackItem::array(vec![
            StackItem::integer(-7),
            StackItem::Bool(true),
            StackItem::byte_array(b"data".to_vec()),
            StackItem::struct_item(vec![StackItem::integer(1)]),
            map,
        ]);

        let mut writer = BinaryWriter::new();
        serialize_item(&item, &mut writer);
        let bytes = writer.into_bytes().unwrap();

        let mut reader = MemoryReader::new(&bytes);
        let back = deserialize_item(&mut reader);
        assert!(reader.error().is_none());
        // The round-tripped array is a fresh object; compare structurally.
        let (a, b) = (item.to_vec().unwrap(), back.to_vec().unwrap());
        assert_eq!(a.len(), b.len());
        assert!(a[0].equals(&b[0]));
        assert!(a[1].equals(&b[1]));
        assert!(a[2].equals(&b[2]));
        assert!(a[3].equals(&b[3]));
    }

    #[test]
    fn interop_items_refuse_serialization() {
        let mut writer = BinaryWriter::new();
        serialize_item(&StackItem::interop(42u32), &mut writer);
        assert!(writer.into_bytes().is_err());
    }
}
