//! Canonical JSON form of call arguments
//!
//! JSON cannot tell every argument value apart on its own: `serde_json` writes
//! NaN and the infinities as `null`, and a unit value looks the same as an
//! empty map once the argument list is split. Before converting to JSON, the
//! value is walked once with `Inspect`. That walk records the serde shape of
//! the top-level value and rejects floats that have no JSON form.

use crate::error::{CacheError, Result};
use serde::ser::{self, Serialize};
use serde_json::Value;

/// Serde shape of a top-level argument value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    /// `()` or a unit struct
    Unit,
    /// A tuple; its elements are positional arguments
    Tuple,
    /// A struct with named fields; its fields are keyword arguments
    Struct,
    /// Anything else, taken as one positional argument
    Other,
}

/// Shape of `value` plus its JSON rendering with every object's keys sorted
pub(crate) fn canonical<T: Serialize + ?Sized>(value: &T) -> Result<(Shape, Value)> {
    let shape = value.serialize(Inspect).map_err(unserializable)?;
    let value = serde_json::to_value(value).map_err(unserializable)?;
    Ok((shape, sort_keys(value)))
}

fn unserializable(e: serde_json::Error) -> CacheError {
    CacheError::UnserializableArguments(e.to_string())
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

type Inspected = std::result::Result<Shape, serde_json::Error>;

fn finite(v: f64) -> Inspected {
    if v.is_finite() {
        Ok(Shape::Other)
    } else {
        Err(ser::Error::custom(format!("float {} has no canonical form", v)))
    }
}

/// Serializer that produces no output; see the module docs
#[derive(Clone, Copy)]
struct Inspect;

/// Nested values of a compound, walked for their floats only
struct Compound(Shape);

macro_rules! scalars {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, _: $ty) -> Inspected {
                Ok(Shape::Other)
            }
        )*
    };
}

impl ser::Serializer for Inspect {
    type Ok = Shape;
    type Error = serde_json::Error;
    type SerializeSeq = Compound;
    type SerializeTuple = Compound;
    type SerializeTupleStruct = Compound;
    type SerializeTupleVariant = Compound;
    type SerializeMap = Compound;
    type SerializeStruct = Compound;
    type SerializeStructVariant = Compound;

    scalars! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
    }

    fn serialize_f32(self, v: f32) -> Inspected {
        finite(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Inspected {
        finite(v)
    }

    fn serialize_none(self) -> Inspected {
        Ok(Shape::Other)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Inspected {
        value.serialize(self).map(|_| Shape::Other)
    }

    fn serialize_unit(self) -> Inspected {
        Ok(Shape::Unit)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Inspected {
        Ok(Shape::Unit)
    }

    fn serialize_unit_variant(self, _name: &'static str, _index: u32, _variant: &'static str) -> Inspected {
        Ok(Shape::Other)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _name: &'static str, value: &T) -> Inspected {
        value.serialize(self).map(|_| Shape::Other)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Inspected {
        value.serialize(self).map(|_| Shape::Other)
    }

    fn serialize_seq(self, _len: Option<usize>) -> std::result::Result<Compound, Self::Error> {
        Ok(Compound(Shape::Other))
    }

    fn serialize_tuple(self, _len: usize) -> std::result::Result<Compound, Self::Error> {
        Ok(Compound(Shape::Tuple))
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> std::result::Result<Compound, Self::Error> {
        Ok(Compound(Shape::Other))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Compound, Self::Error> {
        Ok(Compound(Shape::Other))
    }

    fn serialize_map(self, _len: Option<usize>) -> std::result::Result<Compound, Self::Error> {
        Ok(Compound(Shape::Other))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> std::result::Result<Compound, Self::Error> {
        Ok(Compound(Shape::Struct))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Compound, Self::Error> {
        Ok(Compound(Shape::Other))
    }
}

macro_rules! elements {
    ($($trait:ident::$method:ident),* $(,)?) => {
        $(
            impl ser::$trait for Compound {
                type Ok = Shape;
                type Error = serde_json::Error;

                fn $method<T: ?Sized + Serialize>(&mut self, value: &T) -> std::result::Result<(), Self::Error> {
                    value.serialize(Inspect).map(drop)
                }

                fn end(self) -> Inspected {
                    Ok(self.0)
                }
            }
        )*
    };
}

elements! {
    SerializeSeq::serialize_element,
    SerializeTuple::serialize_element,
    SerializeTupleStruct::serialize_field,
    SerializeTupleVariant::serialize_field,
}

impl ser::SerializeMap for Compound {
    type Ok = Shape;
    type Error = serde_json::Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> std::result::Result<(), Self::Error> {
        key.serialize(Inspect).map(drop)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> std::result::Result<(), Self::Error> {
        value.serialize(Inspect).map(drop)
    }

    fn end(self) -> Inspected {
        Ok(self.0)
    }
}

impl ser::SerializeStruct for Compound {
    type Ok = Shape;
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> std::result::Result<(), Self::Error> {
        value.serialize(Inspect).map(drop)
    }

    fn end(self) -> Inspected {
        Ok(self.0)
    }
}

impl ser::SerializeStructVariant for Compound {
    type Ok = Shape;
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> std::result::Result<(), Self::Error> {
        value.serialize(Inspect).map(drop)
    }

    fn end(self) -> Inspected {
        Ok(self.0)
    }
}
