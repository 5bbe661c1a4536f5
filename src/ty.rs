//! Type descriptors: the closed vocabulary the codec matches values against.
//!
//! A `Ty` is immutable once built. Named definitions (records, enums, tagged
//! unions) are shared through `Arc` and compared by declared name, so a
//! self-referential shape is expressed with `Ty::Ref` and resolved lazily
//! against a [`Catalog`](crate::catalog::Catalog).
use std::fmt;
use std::sync::Arc;

use crate::data::{Data, Kind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    Int,
    Float,
    Decimal,     // arbitrary precision, literal-preserving
    Bool,
    Text,
    Char,        // text of exactly one character
    Uuid,
    Date,
    DateTime,    // with UTC offset
    Time,
    Null,        // the absent-value marker
}

#[derive(Debug, Clone)]
pub enum Ty {
    Prim(Prim),
    /// Members are tried left to right; order is significant and preserved.
    Union(Vec<Ty>),
    Sequence(Box<Ty>),
    Set(Box<Ty>),
    Tuple(Vec<Ty>),
    /// String-keyed, homogeneous values.
    Mapping(Box<Ty>),
    Enum(Arc<EnumTy>),
    Record(Arc<RecordTy>),
    /// Record-like union encoded as a single-key wrapper object.
    Tagged(Arc<TaggedTy>),
    /// Reference to a named definition; the only way to express cycles.
    Ref(String),
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordTy {
    pub name: String,
    pub fields: Vec<FieldTy>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldTy {
    pub name: String,
    pub ty: Ty,
    pub default: Option<Data>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumTy {
    pub name: String,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub label: String,
    pub ty: Ty,
    pub value: Data,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedTy {
    pub name: String,
    pub variants: Vec<VariantTy>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantTy {
    pub label: String,
    pub ty: Ty,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl Ty {
    pub fn int() -> Self { Ty::Prim(Prim::Int) }
    pub fn float() -> Self { Ty::Prim(Prim::Float) }
    pub fn decimal() -> Self { Ty::Prim(Prim::Decimal) }
    pub fn bool() -> Self { Ty::Prim(Prim::Bool) }
    pub fn text() -> Self { Ty::Prim(Prim::Text) }
    pub fn char() -> Self { Ty::Prim(Prim::Char) }
    pub fn uuid() -> Self { Ty::Prim(Prim::Uuid) }
    pub fn date() -> Self { Ty::Prim(Prim::Date) }
    pub fn datetime() -> Self { Ty::Prim(Prim::DateTime) }
    pub fn time() -> Self { Ty::Prim(Prim::Time) }
    pub fn null() -> Self { Ty::Prim(Prim::Null) }

    /// `Optional(inner)` is sugar for `Union([inner, Null])`.
    pub fn optional(inner: Ty) -> Self {
        Ty::Union(vec![inner, Ty::null()])
    }
    pub fn union(members: impl IntoIterator<Item = Ty>) -> Self {
        Ty::Union(members.into_iter().collect())
    }
    pub fn sequence(item: Ty) -> Self { Ty::Sequence(Box::new(item)) }
    pub fn set(item: Ty) -> Self { Ty::Set(Box::new(item)) }
    pub fn mapping(value: Ty) -> Self { Ty::Mapping(Box::new(value)) }
    pub fn tuple(members: impl IntoIterator<Item = Ty>) -> Self {
        Ty::Tuple(members.into_iter().collect())
    }
    pub fn reference(name: impl Into<String>) -> Self { Ty::Ref(name.into()) }

    /// Declared name of a named definition (or of the definition a `Ref` points to).
    pub fn name(&self) -> Option<&str> {
        match self {
            Ty::Record(def) => Some(&def.name),
            Ty::Enum(def) => Some(&def.name),
            Ty::Tagged(def) => Some(&def.name),
            Ty::Ref(name) => Some(name),
            _ => None,
        }
    }

    /// True when the absent marker is directly acceptable: `Null`, `Any`, or a
    /// union listing either. Used for omitted record fields.
    pub fn admits_absent(&self) -> bool {
        match self {
            Ty::Prim(Prim::Null) | Ty::Any => true,
            Ty::Union(members) => members.iter().any(Ty::admits_absent),
            _ => false,
        }
    }
}

impl Prim {
    /// Runtime kind of `Data` this primitive accepts on encode.
    pub fn kind(self) -> Kind {
        match self {
            Prim::Int => Kind::Int,
            Prim::Float => Kind::Float,
            Prim::Decimal => Kind::Decimal,
            Prim::Bool => Kind::Bool,
            Prim::Text => Kind::Text,
            Prim::Char => Kind::Char,
            Prim::Uuid => Kind::Uuid,
            Prim::Date => Kind::Date,
            Prim::DateTime => Kind::DateTime,
            Prim::Time => Kind::Time,
            Prim::Null => Kind::Absent,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Prim::Int => "int",
            Prim::Float => "float",
            Prim::Decimal => "decimal",
            Prim::Bool => "bool",
            Prim::Text => "text",
            Prim::Char => "char",
            Prim::Uuid => "uuid",
            Prim::Date => "date",
            Prim::DateTime => "datetime",
            Prim::Time => "time",
            Prim::Null => "null",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let prim = match name {
            "int" => Prim::Int,
            "float" => Prim::Float,
            "decimal" => Prim::Decimal,
            "bool" => Prim::Bool,
            "text" | "str" => Prim::Text,
            "char" => Prim::Char,
            "uuid" => Prim::Uuid,
            "date" => Prim::Date,
            "datetime" => Prim::DateTime,
            "time" => Prim::Time,
            "null" => Prim::Null,
            _ => return None,
        };
        Some(prim)
    }
}

impl RecordTy {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    /// Appends a required field.
    pub fn field(mut self, name: impl Into<String>, ty: Ty) -> Self {
        self.fields.push(FieldTy { name: name.into(), ty, default: None });
        self
    }

    /// Appends a field that falls back to `default` when missing from the input.
    pub fn field_with_default(mut self, name: impl Into<String>, ty: Ty, default: Data) -> Self {
        self.fields.push(FieldTy { name: name.into(), ty, default: Some(default) });
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldTy> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn into_ty(self) -> Ty { Ty::Record(Arc::new(self)) }
}

impl EnumTy {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), members: Vec::new() }
    }

    pub fn member(mut self, label: impl Into<String>, ty: Ty, value: Data) -> Self {
        self.members.push(EnumMember { label: label.into(), ty, value });
        self
    }

    pub fn get(&self, label: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.label == label)
    }

    pub fn into_ty(self) -> Ty { Ty::Enum(Arc::new(self)) }
}

impl TaggedTy {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), variants: Vec::new() }
    }

    pub fn variant(mut self, label: impl Into<String>, ty: Ty) -> Self {
        self.variants.push(VariantTy { label: label.into(), ty });
        self
    }

    /// A variant carrying no payload; it is written as `{"label": null}`.
    pub fn unit(self, label: impl Into<String>) -> Self {
        self.variant(label, Ty::null())
    }

    pub fn get(&self, label: &str) -> Option<&VariantTy> {
        self.variants.iter().find(|v| v.label == label)
    }

    pub fn into_ty(self) -> Ty { Ty::Tagged(Arc::new(self)) }
}

// ————————————————————————————————————————————————————————————————————————————
// EQUALITY & DISPLAY
// ————————————————————————————————————————————————————————————————————————————

/// Structural, except named definitions which match by declared name.
impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ty::Prim(a), Ty::Prim(b)) => a == b,
            (Ty::Union(a), Ty::Union(b)) | (Ty::Tuple(a), Ty::Tuple(b)) => a == b,
            (Ty::Sequence(a), Ty::Sequence(b))
            | (Ty::Set(a), Ty::Set(b))
            | (Ty::Mapping(a), Ty::Mapping(b)) => a == b,
            (Ty::Enum(a), Ty::Enum(b)) => a.name == b.name,
            (Ty::Record(a), Ty::Record(b)) => a.name == b.name,
            (Ty::Tagged(a), Ty::Tagged(b)) => a.name == b.name,
            (Ty::Ref(a), Ty::Ref(b)) => a == b,
            (Ty::Any, Ty::Any) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, head: &str, tys: &[Ty]) -> fmt::Result {
            write!(f, "{head}[")?;
            for (i, ty) in tys.iter().enumerate() {
                if i > 0 { f.write_str(", ")?; }
                write!(f, "{ty}")?;
            }
            f.write_str("]")
        }
        match self {
            Ty::Prim(p) => write!(f, "{p}"),
            Ty::Union(members) => match members.as_slice() {
                [inner, Ty::Prim(Prim::Null)] => write!(f, "Optional[{inner}]"),
                _ => list(f, "Union", members),
            },
            Ty::Sequence(item) => write!(f, "List[{item}]"),
            Ty::Set(item) => write!(f, "Set[{item}]"),
            Ty::Tuple(members) => list(f, "Tuple", members),
            Ty::Mapping(value) => write!(f, "Dict[text, {value}]"),
            Ty::Enum(def) => f.write_str(&def.name),
            Ty::Record(def) => f.write_str(&def.name),
            Ty::Tagged(def) => f.write_str(&def.name),
            Ty::Ref(name) => f.write_str(name),
            Ty::Any => f.write_str("Any"),
        }
    }
}
