//! Rust types that carry their own descriptor.
//!
//! [`Describe`] supplies the descriptor, [`ToData`] and [`FromData`] move a
//! value to and from the structured model; everything else goes through the
//! ordinary engine, so custom rules and configuration still apply.
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use uuid::Uuid;

use crate::codec::Codec;
use crate::data::Data;
use crate::error::{CodecError, Offending, Result};
use crate::json::Json;
use crate::ty::Ty;

pub trait Describe {
    fn describe() -> Ty;
}

pub trait ToData {
    fn to_data(&self) -> Data;
}

pub trait FromData: Describe + Sized {
    fn from_data(data: Data) -> Result<Self>;
}

impl Codec {
    pub fn encode_typed<T: Describe + ToData>(&self, value: &T) -> Result<Json> {
        self.encode(&T::describe(), &value.to_data())
    }

    pub fn decode_typed<T: FromData>(&self, node: &Json) -> Result<T> {
        T::from_data(self.decode(&T::describe(), node)?)
    }
}

/// Encodes through the shared default codec.
pub fn to_text<T: Describe + ToData>(value: &T) -> Result<String> {
    crate::default_codec().encode_to_text(&value.to_data(), Some(&T::describe()))
}

/// Decodes through the shared default codec.
pub fn from_text<T: FromData>(text: &str) -> Result<T> {
    T::from_data(crate::default_codec().decode_from_text(&T::describe(), text)?)
}

/// The error for structured data that does not have `T`'s shape.
pub fn unexpected<T: Describe>(data: Data) -> CodecError {
    CodecError::TypeMismatch {
        path: "/".into(),
        expected: T::describe(),
        found: Offending::Data(data),
    }
}

/// Removes and converts one record field; a missing field reads as `Absent`.
pub fn take_field<T: FromData>(fields: &mut IndexMap<String, Data>, name: &str) -> Result<T> {
    T::from_data(fields.shift_remove(name).unwrap_or(Data::Absent))
}

// ---------------------------- Scalars ---------------------------- //

macro_rules! scalar {
    ($rust:ty, $ty:expr, $variant:ident) => {
        impl Describe for $rust {
            fn describe() -> Ty { $ty }
        }
        impl ToData for $rust {
            fn to_data(&self) -> Data { Data::$variant(self.clone()) }
        }
        impl FromData for $rust {
            fn from_data(data: Data) -> Result<Self> {
                match data {
                    Data::$variant(v) => Ok(v),
                    other => Err(unexpected::<Self>(other)),
                }
            }
        }
    };
}

scalar!(i64, Ty::int(), Int);
scalar!(bool, Ty::bool(), Bool);
scalar!(String, Ty::text(), Text);
scalar!(char, Ty::char(), Char);
scalar!(Uuid, Ty::uuid(), Uuid);
scalar!(NaiveDate, Ty::date(), Date);
scalar!(DateTime<FixedOffset>, Ty::datetime(), DateTime);
scalar!(NaiveTime, Ty::time(), Time);

macro_rules! narrow_int {
    ($rust:ty) => {
        impl Describe for $rust {
            fn describe() -> Ty { Ty::int() }
        }
        impl ToData for $rust {
            fn to_data(&self) -> Data { Data::Int(i64::from(*self)) }
        }
        impl FromData for $rust {
            fn from_data(data: Data) -> Result<Self> {
                match data {
                    Data::Int(i) => <$rust>::try_from(i).map_err(|_| CodecError::Value {
                        path: "/".into(),
                        ty: Ty::int(),
                        found: Offending::Data(Data::Int(i)),
                        reason: format!("out of range for {}", stringify!($rust)),
                    }),
                    other => Err(unexpected::<Self>(other)),
                }
            }
        }
    };
}

narrow_int!(i32);
narrow_int!(u32);

impl Describe for f64 {
    fn describe() -> Ty { Ty::float() }
}

impl ToData for f64 {
    fn to_data(&self) -> Data { Data::Float(OrderedFloat(*self)) }
}

impl FromData for f64 {
    fn from_data(data: Data) -> Result<Self> {
        match data {
            Data::Float(f) => Ok(f.0),
            other => Err(unexpected::<Self>(other)),
        }
    }
}

/// Arbitrary JSON, described as `Any`.
impl Describe for Json {
    fn describe() -> Ty { Ty::Any }
}

impl ToData for Json {
    fn to_data(&self) -> Data { Data::Json(self.clone()) }
}

impl FromData for Json {
    fn from_data(data: Data) -> Result<Self> {
        match data {
            Data::Json(v) => Ok(v),
            other => Err(unexpected::<Self>(other)),
        }
    }
}

// ---------------------------- Containers ---------------------------- //

impl<T: Describe> Describe for Option<T> {
    fn describe() -> Ty { Ty::optional(T::describe()) }
}

impl<T: ToData> ToData for Option<T> {
    fn to_data(&self) -> Data {
        match self {
            Some(v) => v.to_data(),
            None => Data::Absent,
        }
    }
}

impl<T: FromData> FromData for Option<T> {
    fn from_data(data: Data) -> Result<Self> {
        match data {
            Data::Absent => Ok(None),
            other => T::from_data(other).map(Some),
        }
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> Ty { Ty::sequence(T::describe()) }
}

impl<T: ToData> ToData for Vec<T> {
    fn to_data(&self) -> Data { Data::seq(self.iter().map(ToData::to_data)) }
}

impl<T: FromData> FromData for Vec<T> {
    fn from_data(data: Data) -> Result<Self> {
        match data {
            Data::Seq(items) => items.into_iter().map(T::from_data).collect(),
            other => Err(unexpected::<Self>(other)),
        }
    }
}

impl<T: Describe> Describe for IndexMap<String, T> {
    fn describe() -> Ty { Ty::mapping(T::describe()) }
}

impl<T: ToData> ToData for IndexMap<String, T> {
    fn to_data(&self) -> Data {
        Data::Map(self.iter().map(|(k, v)| (k.clone(), v.to_data())).collect())
    }
}

impl<T: FromData> FromData for IndexMap<String, T> {
    fn from_data(data: Data) -> Result<Self> {
        match data {
            Data::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_data(v).map(|v| (k, v)))
                .collect(),
            other => Err(unexpected::<Self>(other)),
        }
    }
}

impl<A: Describe, B: Describe> Describe for (A, B) {
    fn describe() -> Ty { Ty::tuple([A::describe(), B::describe()]) }
}

impl<A: ToData, B: ToData> ToData for (A, B) {
    fn to_data(&self) -> Data { Data::tuple([self.0.to_data(), self.1.to_data()]) }
}

impl<A: FromData, B: FromData> FromData for (A, B) {
    fn from_data(data: Data) -> Result<Self> {
        match data {
            Data::Tuple(items) => match <[Data; 2]>::try_from(items) {
                Ok([a, b]) => Ok((A::from_data(a)?, B::from_data(b)?)),
                Err(items) => Err(unexpected::<Self>(Data::Tuple(items))),
            },
            other => Err(unexpected::<Self>(other)),
        }
    }
}

impl<A: Describe, B: Describe, C: Describe> Describe for (A, B, C) {
    fn describe() -> Ty { Ty::tuple([A::describe(), B::describe(), C::describe()]) }
}

impl<A: ToData, B: ToData, C: ToData> ToData for (A, B, C) {
    fn to_data(&self) -> Data {
        Data::tuple([self.0.to_data(), self.1.to_data(), self.2.to_data()])
    }
}

impl<A: FromData, B: FromData, C: FromData> FromData for (A, B, C) {
    fn from_data(data: Data) -> Result<Self> {
        match data {
            Data::Tuple(items) => match <[Data; 3]>::try_from(items) {
                Ok([a, b, c]) => Ok((A::from_data(a)?, B::from_data(b)?, C::from_data(c)?)),
                Err(items) => Err(unexpected::<Self>(Data::Tuple(items))),
            },
            other => Err(unexpected::<Self>(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::RecordTy;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Address {
        street: String,
        house: i32,
        apt: Option<String>,
    }

    impl Describe for Address {
        fn describe() -> Ty {
            RecordTy::new("Address")
                .field("street", String::describe())
                .field("house", i32::describe())
                .field("apt", Option::<String>::describe())
                .into_ty()
        }
    }

    impl ToData for Address {
        fn to_data(&self) -> Data {
            Data::record("Address", [
                ("street", self.street.to_data()),
                ("house", self.house.to_data()),
                ("apt", self.apt.to_data()),
            ])
        }
    }

    impl FromData for Address {
        fn from_data(data: Data) -> Result<Self> {
            match data {
                Data::Record { mut fields, .. } => Ok(Address {
                    street: take_field(&mut fields, "street")?,
                    house: take_field(&mut fields, "house")?,
                    apt: take_field(&mut fields, "apt")?,
                }),
                other => Err(unexpected::<Self>(other)),
            }
        }
    }

    #[test]
    fn user_record_round_trips() {
        let address = Address { street: "Main".into(), house: 12, apt: None };
        let text = to_text(&address).unwrap();
        assert_eq!(text, r#"{"street":"Main","house":12,"apt":null}"#);
        assert_eq!(from_text::<Address>(r#"{"street":"Main","house":12}"#).unwrap(), address);
    }

    #[test]
    fn typed_containers() {
        let codec = Codec::default();
        let value: Vec<(String, Option<f64>)> = vec![("a".into(), Some(1.5)), ("b".into(), None)];
        let node = codec.encode_typed(&value).unwrap();
        assert_eq!(node, json!([["a", 1.5], ["b", null]]));
        assert_eq!(codec.decode_typed::<Vec<(String, Option<f64>)>>(&node).unwrap(), value);

        let map: IndexMap<String, u32> = codec.decode_typed(&json!({"x": 1, "y": 2})).unwrap();
        assert_eq!(map.get("y"), Some(&2));
    }

    #[test]
    fn narrow_integers_check_range() {
        let err = from_text::<u32>("-1").unwrap_err();
        assert!(matches!(err, CodecError::Value { .. }), "{err}");
        assert_eq!(from_text::<i32>("7").unwrap(), 7);
    }

    #[test]
    fn json_passes_through_as_any() {
        let node = json!({"free": ["form", 1]});
        assert_eq!(Json::describe(), Ty::Any);
        assert_eq!(from_text::<Json>(&node.to_string()).unwrap(), node);
    }

    #[test]
    fn shape_errors_on_hand_built_data() {
        assert!(matches!(i64::from_data(Data::text("3")), Err(CodecError::TypeMismatch { .. })));
        assert_eq!(Option::<i64>::from_data(Data::Absent).unwrap(), None);
    }
}
