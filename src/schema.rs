//! Schema documents: named type definitions kept in JSON files.
//!
//! ```json
//! { "root": "Person",
//!   "types": {
//!     "Person": {"record": {"fields": [
//!         {"name": "name", "type": "text"},
//!         {"name": "nick", "type": {"optional": "text"}, "default": null}]}},
//!     "Color": {"enum": {"members": [{"label": "Red", "type": "text", "value": "r"}]}},
//!     "Shape": {"tagged": {"variants": [{"label": "Circle", "type": "float"}]}} } }
//! ```
//!
//! Type names resolve to primitives first (`int`, `text`, `any`, ...) and to
//! the document's own definitions otherwise; those always compile to
//! [`Ty::Ref`], so definitions may refer to each other in any order and to
//! themselves. Defaults and enum values are JSON literals decoded through
//! their declared type, in declaration order, so a literal can only use
//! definitions that come before it.
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::catalog::Catalog;
use crate::codec::Codec;
use crate::config::{self, CodecConfig};
use crate::data::Data;
use crate::error::{CodecError, Result};
use crate::json::Json;
use crate::ty::{EnumTy, Prim, RecordTy, TaggedTy, Ty};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDoc {
    #[serde(default)]
    pub root: Option<TypeExpr>,
    #[serde(default)]
    pub types: IndexMap<String, TypeDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDef {
    Record { fields: Vec<FieldDef> },
    Enum { members: Vec<MemberDef> },
    Tagged { variants: Vec<VariantDef> },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    /// `"default": null` is a real default, distinct from no default.
    #[serde(default, deserialize_with = "present")]
    pub default: Option<Json>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberDef {
    pub label: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    pub value: Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantDef {
    pub label: String,
    /// Omitted for unit variants, which carry `null`.
    #[serde(rename = "type", default)]
    pub ty: Option<TypeExpr>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeExpr {
    Name(String),
    Compound(Compound),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compound {
    Optional(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Sequence(Box<TypeExpr>),
    Set(Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    Mapping(Box<TypeExpr>),
}

fn present<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Json>, D::Error> {
    Json::deserialize(de).map(Some)
}

/// A compiled document.
#[derive(Debug, Clone)]
pub struct Schema {
    pub catalog: Catalog,
    pub root: Option<Ty>,
}

impl SchemaDoc {
    pub fn from_json_str(src: &str) -> Result<Self> {
        Self::from_slice(src.as_bytes())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        config::from_json_with_path(bytes).map_err(CodecError::Schema)
    }

    pub fn compile(&self) -> Result<Schema> {
        let mut catalog = Catalog::new();
        for (name, def) in &self.types {
            // literals see everything defined so far
            let scratch = Codec::builder().catalog(catalog.clone()).build()?;
            let ty = match def {
                TypeDef::Record { fields } => self.compile_record(&scratch, name, fields)?,
                TypeDef::Enum { members } => self.compile_enum(&scratch, name, members)?,
                TypeDef::Tagged { variants } => self.compile_tagged(name, variants)?,
            };
            catalog.define(ty)?;
        }
        let root = self.root.as_ref().map(|expr| self.resolve(expr)).transpose()?;
        Ok(Schema { catalog, root })
    }

    fn resolve(&self, expr: &TypeExpr) -> Result<Ty> {
        let compound = match expr {
            TypeExpr::Name(name) => return self.resolve_name(name),
            TypeExpr::Compound(compound) => compound,
        };
        let ty = match compound {
            Compound::Optional(inner) => Ty::optional(self.resolve(inner)?),
            Compound::Union(members) => Ty::union(self.resolve_all(members)?),
            Compound::Sequence(item) => Ty::sequence(self.resolve(item)?),
            Compound::Set(item) => Ty::set(self.resolve(item)?),
            Compound::Tuple(members) => Ty::tuple(self.resolve_all(members)?),
            Compound::Mapping(value) => Ty::mapping(self.resolve(value)?),
        };
        Ok(ty)
    }

    fn resolve_all(&self, exprs: &[TypeExpr]) -> Result<Vec<Ty>> {
        exprs.iter().map(|e| self.resolve(e)).collect()
    }

    fn resolve_name(&self, name: &str) -> Result<Ty> {
        if name == "any" {
            return Ok(Ty::Any);
        }
        if let Some(prim) = Prim::from_name(name) {
            return Ok(Ty::Prim(prim));
        }
        if self.types.contains_key(name) {
            return Ok(Ty::reference(name));
        }
        Err(CodecError::Schema(format!("unknown type `{name}`")))
    }

    fn compile_record(&self, scratch: &Codec, name: &str, fields: &[FieldDef]) -> Result<Ty> {
        let mut record = RecordTy::new(name);
        for field in fields {
            if record.get(&field.name).is_some() {
                return Err(CodecError::Schema(format!("`{name}` declares field `{}` twice", field.name)));
            }
            let ty = self.resolve(&field.ty)?;
            record = match &field.default {
                Some(literal) => {
                    let default = literal_of(scratch, &ty, literal)
                        .map_err(|e| schema_error(&format!("default of `{name}.{}`", field.name), e))?;
                    record.field_with_default(field.name.clone(), ty, default)
                }
                None => record.field(field.name.clone(), ty),
            };
        }
        Ok(record.into_ty())
    }

    fn compile_enum(&self, scratch: &Codec, name: &str, members: &[MemberDef]) -> Result<Ty> {
        let mut def = EnumTy::new(name);
        for member in members {
            if def.get(&member.label).is_some() {
                return Err(CodecError::Schema(format!("`{name}` declares member `{}` twice", member.label)));
            }
            let ty = self.resolve(&member.ty)?;
            let value = literal_of(scratch, &ty, &member.value)
                .map_err(|e| schema_error(&format!("value of `{name}.{}`", member.label), e))?;
            def = def.member(member.label.clone(), ty, value);
        }
        Ok(def.into_ty())
    }

    fn compile_tagged(&self, name: &str, variants: &[VariantDef]) -> Result<Ty> {
        let mut def = TaggedTy::new(name);
        for variant in variants {
            if def.get(&variant.label).is_some() {
                return Err(CodecError::Schema(format!("`{name}` declares variant `{}` twice", variant.label)));
            }
            def = match &variant.ty {
                Some(expr) => def.variant(variant.label.clone(), self.resolve(expr)?),
                None => def.unit(variant.label.clone()),
            };
        }
        Ok(def.into_ty())
    }
}

impl Schema {
    pub fn from_json_str(src: &str) -> Result<Self> {
        SchemaDoc::from_json_str(src)?.compile()
    }

    /// The named definition or primitive, or the document root when `name`
    /// is `None`.
    pub fn ty(&self, name: Option<&str>) -> Result<Ty> {
        match name {
            Some(name) if name == "any" => Ok(Ty::Any),
            Some(name) => match Prim::from_name(name) {
                Some(prim) => Ok(Ty::Prim(prim)),
                None if self.catalog.get(name).is_some() => Ok(Ty::reference(name)),
                None => Err(CodecError::Schema(format!("schema defines no type `{name}`"))),
            },
            None => self.root.clone().ok_or_else(|| {
                CodecError::Schema("schema declares no root type; name one explicitly".into())
            }),
        }
    }

    /// A codec over this schema's definitions.
    pub fn codec(&self, config: CodecConfig) -> Result<Codec> {
        Codec::builder().catalog(self.catalog.clone()).config(config).build()
    }
}

fn literal_of(scratch: &Codec, ty: &Ty, literal: &Json) -> Result<Data> {
    scratch.decode(ty, literal)
}

fn schema_error(what: &str, err: CodecError) -> CodecError {
    CodecError::Schema(format!("{what}: {err}"))
}
