//! The structured, in-memory side of the codec.
//!
//! `Data` is self-tagged: every value knows its own runtime [`Kind`], which is
//! what union encoding inspects to pick a member descriptor.
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;
use serde_json::Number;
use uuid::Uuid;

use crate::json::Json;
use crate::ty::{Prim, Ty};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    Absent,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Decimal(Number),
    Text(String),
    Char(char),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Time(NaiveTime),
    Seq(Vec<Data>),
    /// Unique elements, kept in first-insertion order.
    Set(Vec<Data>),
    Tuple(Vec<Data>),
    Map(IndexMap<String, Data>),
    Enum { name: String, label: String },
    Record { name: String, fields: IndexMap<String, Data> },
    Variant { name: String, label: String, value: Box<Data> },
    /// Untouched JSON, produced by decoding against `Any`.
    Json(Json),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Absent,
    Bool,
    Int,
    Float,
    Decimal,
    Text,
    Char,
    Uuid,
    Date,
    DateTime,
    Time,
    Seq,
    Set,
    Tuple,
    Map,
    Enum,
    Record,
    Variant,
    Json,
}

impl Data {
    pub fn text(s: impl Into<String>) -> Self { Data::Text(s.into()) }
    pub fn float(f: f64) -> Self { Data::Float(OrderedFloat(f)) }

    /// Parses a numeric literal, keeping its exact textual form.
    pub fn decimal(literal: &str) -> Result<Self, serde_json::Error> {
        literal.parse::<Number>().map(Data::Decimal)
    }

    pub fn seq(items: impl IntoIterator<Item = Data>) -> Self {
        Data::Seq(items.into_iter().collect())
    }

    pub fn tuple(items: impl IntoIterator<Item = Data>) -> Self {
        Data::Tuple(items.into_iter().collect())
    }

    /// Builds a set; later duplicates of an element are dropped.
    pub fn set(items: impl IntoIterator<Item = Data>) -> Self {
        let unique: IndexSet<Data> = items.into_iter().collect();
        Data::Set(unique.into_iter().collect())
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Data)>) -> Self {
        Data::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn record<K: Into<String>>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (K, Data)>,
    ) -> Self {
        Data::Record {
            name: name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn member(name: impl Into<String>, label: impl Into<String>) -> Self {
        Data::Enum { name: name.into(), label: label.into() }
    }

    pub fn variant(name: impl Into<String>, label: impl Into<String>, value: Data) -> Self {
        Data::Variant { name: name.into(), label: label.into(), value: Box::new(value) }
    }

    pub fn is_absent(&self) -> bool { matches!(self, Data::Absent) }

    pub fn kind(&self) -> Kind {
        match self {
            Data::Absent => Kind::Absent,
            Data::Bool(_) => Kind::Bool,
            Data::Int(_) => Kind::Int,
            Data::Float(_) => Kind::Float,
            Data::Decimal(_) => Kind::Decimal,
            Data::Text(_) => Kind::Text,
            Data::Char(_) => Kind::Char,
            Data::Uuid(_) => Kind::Uuid,
            Data::Date(_) => Kind::Date,
            Data::DateTime(_) => Kind::DateTime,
            Data::Time(_) => Kind::Time,
            Data::Seq(_) => Kind::Seq,
            Data::Set(_) => Kind::Set,
            Data::Tuple(_) => Kind::Tuple,
            Data::Map(_) => Kind::Map,
            Data::Enum { .. } => Kind::Enum,
            Data::Record { .. } => Kind::Record,
            Data::Variant { .. } => Kind::Variant,
            Data::Json(_) => Kind::Json,
        }
    }

    /// Derives a descriptor from the value's own tag.
    ///
    /// Containers get `Any` items (each element is inferred again when it is
    /// encoded); named values become references into the codec's catalog.
    pub fn infer_ty(&self) -> Ty {
        match self {
            Data::Absent => Ty::Prim(Prim::Null),
            Data::Bool(_) => Ty::bool(),
            Data::Int(_) => Ty::int(),
            Data::Float(_) => Ty::float(),
            Data::Decimal(_) => Ty::decimal(),
            Data::Text(_) => Ty::text(),
            Data::Char(_) => Ty::char(),
            Data::Uuid(_) => Ty::uuid(),
            Data::Date(_) => Ty::date(),
            Data::DateTime(_) => Ty::datetime(),
            Data::Time(_) => Ty::time(),
            Data::Seq(_) => Ty::sequence(Ty::Any),
            Data::Set(_) => Ty::set(Ty::Any),
            Data::Tuple(items) => Ty::tuple(items.iter().map(|_| Ty::Any)),
            Data::Map(_) => Ty::mapping(Ty::Any),
            Data::Enum { name, .. }
            | Data::Record { name, .. }
            | Data::Variant { name, .. } => Ty::Ref(name.clone()),
            Data::Json(_) => Ty::Any,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Absent => "absent",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Decimal => "decimal",
            Kind::Text => "text",
            Kind::Char => "char",
            Kind::Uuid => "uuid",
            Kind::Date => "date",
            Kind::DateTime => "datetime",
            Kind::Time => "time",
            Kind::Seq => "sequence",
            Kind::Set => "set",
            Kind::Tuple => "tuple",
            Kind::Map => "mapping",
            Kind::Enum => "enum",
            Kind::Record => "record",
            Kind::Variant => "variant",
            Kind::Json => "json",
        };
        f.write_str(s)
    }
}

/// Consistent with `Eq`: maps and records compare regardless of key order,
/// so their entries are hashed order-independently.
impl Hash for Data {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Data::Absent => {}
            Data::Bool(b) => b.hash(state),
            Data::Int(i) => i.hash(state),
            Data::Float(x) => x.hash(state),
            Data::Decimal(n) => n.hash(state),
            Data::Text(s) => s.hash(state),
            Data::Char(c) => c.hash(state),
            Data::Uuid(u) => u.hash(state),
            Data::Date(d) => d.hash(state),
            Data::DateTime(dt) => dt.hash(state),
            Data::Time(t) => t.hash(state),
            Data::Seq(xs) | Data::Set(xs) | Data::Tuple(xs) => xs.hash(state),
            Data::Map(m) => hash_entries(m.len(), m.iter(), |v, h| v.hash(h), state),
            Data::Enum { name, label } => {
                name.hash(state);
                label.hash(state);
            }
            Data::Record { name, fields } => {
                name.hash(state);
                hash_entries(fields.len(), fields.iter(), |v, h| v.hash(h), state);
            }
            Data::Variant { name, label, value } => {
                name.hash(state);
                label.hash(state);
                value.hash(state);
            }
            Data::Json(v) => hash_json(v, state),
        }
    }
}

fn hash_json<H: Hasher>(v: &Json, state: &mut H) {
    mem::discriminant(v).hash(state);
    match v {
        Json::Null => {}
        Json::Bool(b) => b.hash(state),
        Json::Number(n) => n.hash(state),
        Json::String(s) => s.hash(state),
        Json::Array(xs) => {
            state.write_usize(xs.len());
            for x in xs { hash_json(x, state); }
        }
        Json::Object(m) => hash_entries(m.len(), m.iter(), |v, h| hash_json(v, h), state),
    }
}

/// Sums per-entry hashes, so entry order does not matter.
fn hash_entries<'a, V: 'a, H: Hasher>(
    len: usize,
    entries: impl Iterator<Item = (&'a String, &'a V)>,
    hash_value: impl Fn(&V, &mut DefaultHasher),
    state: &mut H,
) {
    state.write_usize(len);
    let mut sum = 0u64;
    for (k, v) in entries {
        let mut h = DefaultHasher::new();
        k.hash(&mut h);
        hash_value(v, &mut h);
        sum = sum.wrapping_add(h.finish());
    }
    state.write_u64(sum);
}

/// Index of the first element equal to an earlier one.
pub(crate) fn first_duplicate(items: &[Data]) -> Option<usize> {
    let mut seen = IndexSet::with_capacity(items.len());
    items.iter().position(|x| !seen.insert(x))
}

/// Compact, diagnostic rendering used in error messages.
impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn items(f: &mut fmt::Formatter<'_>, open: &str, xs: &[Data], close: &str) -> fmt::Result {
            f.write_str(open)?;
            for (i, x) in xs.iter().enumerate() {
                if i > 0 { f.write_str(", ")?; }
                write!(f, "{x}")?;
            }
            f.write_str(close)
        }
        match self {
            Data::Absent => f.write_str("absent"),
            Data::Bool(b) => write!(f, "{b}"),
            Data::Int(i) => write!(f, "{i}"),
            Data::Float(x) => write!(f, "{}", x.0),
            Data::Decimal(n) => write!(f, "{n}"),
            Data::Text(s) => write!(f, "{s:?}"),
            Data::Char(c) => write!(f, "{c:?}"),
            Data::Uuid(u) => write!(f, "{u}"),
            Data::Date(d) => write!(f, "{d}"),
            Data::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Data::Time(t) => write!(f, "{t}"),
            Data::Seq(xs) => items(f, "[", xs, "]"),
            Data::Set(xs) => items(f, "{", xs, "}"),
            Data::Tuple(xs) => items(f, "(", xs, ")"),
            Data::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{k:?}: {v}")?;
                }
                f.write_str("}")
            }
            Data::Enum { name, label } => write!(f, "{name}.{label}"),
            Data::Record { name, fields } => {
                write!(f, "{name}(")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{k}={v}")?;
                }
                f.write_str(")")
            }
            Data::Variant { name, label, value } => write!(f, "{name}.{label}({value})"),
            Data::Json(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_first_insertion_order() {
        let set = Data::set([Data::Int(3), Data::Int(1), Data::Int(3), Data::Int(2)]);
        assert_eq!(set, Data::Set(vec![Data::Int(3), Data::Int(1), Data::Int(2)]));
    }

    #[test]
    fn duplicates_found_by_hash() {
        let items: Vec<Data> = (0..50_000).map(Data::Int).chain([Data::Int(7)]).collect();
        assert_eq!(first_duplicate(&items), Some(50_000));
        assert_eq!(first_duplicate(&items[..50_000]), None);
    }

    #[test]
    fn map_hash_ignores_key_order() {
        fn hash_of(d: &Data) -> u64 {
            let mut h = DefaultHasher::new();
            d.hash(&mut h);
            h.finish()
        }
        let ab = Data::map([("a", Data::Int(1)), ("b", Data::Int(2))]);
        let ba = Data::map([("b", Data::Int(2)), ("a", Data::Int(1))]);
        assert_eq!(ab, ba);
        assert_eq!(hash_of(&ab), hash_of(&ba));
        let json_ab = Data::Json(serde_json::json!({"a": 1, "b": [2]}));
        let json_ba = Data::Json(serde_json::json!({"b": [2], "a": 1}));
        assert_eq!(json_ab, json_ba);
        assert_eq!(hash_of(&json_ab), hash_of(&json_ba));
        assert_eq!(first_duplicate(&[ab, ba]), Some(1));
    }

    #[test]
    fn decimal_keeps_literal_text() {
        let d = Data::decimal("1.230").unwrap();
        assert_eq!(d.to_string(), "1.230");
        assert!(Data::decimal("abc").is_err());
    }

    #[test]
    fn infer_containers_and_named_values() {
        assert_eq!(Data::seq([Data::Int(1)]).infer_ty(), Ty::sequence(Ty::Any));
        assert_eq!(
            Data::tuple([Data::Int(1), Data::text("a")]).infer_ty(),
            Ty::tuple([Ty::Any, Ty::Any]),
        );
        assert_eq!(
            Data::record("Point", [("x", Data::Int(1))]).infer_ty(),
            Ty::Ref("Point".into()),
        );
        assert_eq!(Data::Json(Json::Null).infer_ty(), Ty::Any);
    }

    #[test]
    fn display_is_compact() {
        let v = Data::record("P", [("a", Data::seq([Data::Int(1), Data::text("x")]))]);
        assert_eq!(v.to_string(), r#"P(a=[1, "x"])"#);
    }
}
