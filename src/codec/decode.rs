use indexmap::IndexMap;
use tracing::{debug, trace};

use super::scalar::{self, Reject};
use super::{wire_keys, Codec, Path};
use crate::data::{first_duplicate, Data};
use crate::error::{CodecError, Offending, Result};
use crate::json::Json;
use crate::rule::Outcome;
use crate::ty::{EnumTy, Prim, RecordTy, TaggedTy, Ty};

/// One decode call in flight: depth counter and current path.
pub struct Decoder<'c> {
    codec: &'c Codec,
    depth: usize,
    path: Path,
}

impl<'c> Decoder<'c> {
    pub fn new(codec: &'c Codec) -> Self {
        Self { codec, depth: 0, path: Path::default() }
    }

    pub fn codec(&self) -> &'c Codec { self.codec }
    pub fn depth(&self) -> usize { self.depth }

    /// Decodes one nested step. Custom rules call this to recurse.
    pub fn decode(&mut self, ty: &Ty, node: &Json) -> Result<Data> {
        let limit = self.codec.config().max_depth;
        if self.depth >= limit {
            debug!(path = %self.path, limit, "decode depth guard tripped");
            return Err(CodecError::DepthExceeded { path: self.path.to_string(), limit });
        }
        self.depth += 1;
        let out = self.dispatch(ty, node);
        self.depth -= 1;
        out
    }

    /// Same as [`decode`](Self::decode) with `key` appended to the error path.
    pub fn decode_at_key(&mut self, key: &str, ty: &Ty, node: &Json) -> Result<Data> {
        self.path.push_key(key);
        let out = self.decode(ty, node);
        self.path.pop();
        out
    }

    /// Same as [`decode`](Self::decode) with `index` appended to the error path.
    pub fn decode_at_index(&mut self, index: usize, ty: &Ty, node: &Json) -> Result<Data> {
        self.path.push_index(index);
        let out = self.decode(ty, node);
        self.path.pop();
        out
    }

    pub fn mismatch(&self, expected: &Ty, found: &Json) -> CodecError {
        CodecError::TypeMismatch {
            path: self.path.to_string(),
            expected: expected.clone(),
            found: Offending::Json(found.clone()),
        }
    }

    pub fn invalid(&self, ty: &Ty, found: &Json, reason: impl Into<String>) -> CodecError {
        CodecError::Value {
            path: self.path.to_string(),
            ty: ty.clone(),
            found: Offending::Json(found.clone()),
            reason: reason.into(),
        }
    }

    // ---------------------------- Dispatch ---------------------------- //

    fn dispatch(&mut self, ty: &Ty, node: &Json) -> Result<Data> {
        let codec = self.codec;
        for (index, rule) in codec.decode_rules().iter().enumerate() {
            if let Outcome::Accepted(data) = rule.try_decode(self, ty, node)? {
                trace!(rule = index, %ty, path = %self.path, "custom decode rule accepted");
                return Ok(data);
            }
        }
        self.builtin(ty, node)
    }

    fn builtin(&mut self, ty: &Ty, node: &Json) -> Result<Data> {
        match ty {
            Ty::Prim(prim) => self.decode_prim(ty, *prim, node),
            Ty::Union(members) => self.decode_union(ty, members, node),
            Ty::Sequence(item) => match node {
                Json::Array(items) => self.decode_items(item, items).map(Data::Seq),
                _ => Err(self.mismatch(ty, node)),
            },
            Ty::Set(item) => match node {
                Json::Array(items) => {
                    let decoded = self.decode_items(item, items)?;
                    if let Some(i) = first_duplicate(&decoded) {
                        return Err(self.invalid(ty, node, format!(
                            "duplicate element {} at index {i}", decoded[i]
                        )));
                    }
                    Ok(Data::Set(decoded))
                }
                _ => Err(self.mismatch(ty, node)),
            },
            Ty::Tuple(members) => match node {
                Json::Array(items) if items.len() == members.len() => {
                    let mut out = Vec::with_capacity(items.len());
                    for (i, (member, item)) in members.iter().zip(items).enumerate() {
                        out.push(self.decode_at_index(i, member, item)?);
                    }
                    Ok(Data::Tuple(out))
                }
                Json::Array(items) => Err(self.invalid(ty, node, format!(
                    "expected an array of size {}, found size {}", members.len(), items.len()
                ))),
                _ => Err(self.mismatch(ty, node)),
            },
            Ty::Mapping(value_ty) => match node {
                Json::Object(entries) => {
                    let mut out = IndexMap::with_capacity(entries.len());
                    for (key, entry) in entries {
                        let data = self.decode_at_key(key, value_ty, entry)?;
                        out.insert(key.clone(), data);
                    }
                    Ok(Data::Map(out))
                }
                _ => Err(self.mismatch(ty, node)),
            },
            Ty::Enum(def) => self.decode_enum(ty, def, node),
            Ty::Record(def) => self.decode_record(ty, def, node),
            Ty::Tagged(def) => self.decode_tagged(ty, def, node),
            Ty::Ref(name) => match self.codec().catalog().get(name) {
                Some(def) => self.dispatch(def, node),
                None => Err(self.mismatch(ty, node)),
            },
            Ty::Any => Ok(Data::Json(node.clone())),
        }
    }

    fn decode_prim(&self, ty: &Ty, prim: Prim, node: &Json) -> Result<Data> {
        scalar::decode(prim, node).map_err(|reject| match reject {
            Reject::Mismatch => self.mismatch(ty, node),
            Reject::Invalid(reason) => self.invalid(ty, node, reason),
        })
    }

    /// First member that decodes without error wins, strictly left to right.
    fn decode_union(&mut self, ty: &Ty, members: &[Ty], node: &Json) -> Result<Data> {
        for member in members {
            match self.dispatch(member, node) {
                Ok(data) => {
                    trace!(%member, path = %self.path, "union member accepted");
                    return Ok(data);
                }
                Err(err) if err.is_shape_error() => {
                    debug!(%member, path = %self.path, error = %err, "union member rejected");
                }
                Err(err) => return Err(err),
            }
        }
        Err(self.mismatch(ty, node))
    }

    fn decode_items(&mut self, item: &Ty, items: &[Json]) -> Result<Vec<Data>> {
        let mut out = Vec::with_capacity(items.len());
        for (i, x) in items.iter().enumerate() {
            out.push(self.decode_at_index(i, item, x)?);
        }
        Ok(out)
    }

    /// A node no member type accepts is a mismatch; one that decodes but
    /// equals no member value is invalid.
    fn decode_enum(&mut self, ty: &Ty, def: &EnumTy, node: &Json) -> Result<Data> {
        let mut shape_matched = false;
        for member in &def.members {
            match self.decode(&member.ty, node) {
                Ok(data) if data == member.value => {
                    return Ok(Data::Enum { name: def.name.clone(), label: member.label.clone() });
                }
                Ok(_) => shape_matched = true,
                Err(err) if err.is_shape_error() => {}
                Err(err) => return Err(err),
            }
        }
        if shape_matched {
            Err(self.invalid(ty, node, format!("no member of {} holds this value", def.name)))
        } else {
            Err(self.mismatch(ty, node))
        }
    }

    fn decode_record(&mut self, ty: &Ty, def: &RecordTy, node: &Json) -> Result<Data> {
        let Json::Object(entries) = node else {
            return Err(self.mismatch(ty, node));
        };
        let config = self.codec().config();
        let keys = wire_keys(config.field_case, ty).map_err(|c| self.invalid(ty, node, c.to_string()))?;

        if config.strict_fields {
            if let Some(unknown) = entries.keys().find(|k| !keys.contains(k)) {
                return Err(self.invalid(ty, node, format!("unknown field `{unknown}`")));
            }
        }

        let mut fields = IndexMap::with_capacity(def.fields.len());
        for (field, key) in def.fields.iter().zip(&keys) {
            let data = match (entries.get(key), &field.default) {
                (Some(entry), _) => self.decode_at_key(key, &field.ty, entry)?,
                (None, Some(default)) => default.clone(),
                (None, None) if field.ty.admits_absent() => Data::Absent,
                (None, None) if *key == field.name => {
                    return Err(self.invalid(ty, node, format!("missing field `{key}`")));
                }
                (None, None) => {
                    return Err(self.invalid(ty, node, format!("missing field `{}` (key `{key}`)", field.name)));
                }
            };
            fields.insert(field.name.clone(), data);
        }
        Ok(Data::Record { name: def.name.clone(), fields })
    }

    fn decode_tagged(&mut self, ty: &Ty, def: &TaggedTy, node: &Json) -> Result<Data> {
        let entry = match node {
            Json::Object(entries) if entries.len() == 1 => entries.iter().next(),
            _ => None,
        };
        let Some((key, inner)) = entry else {
            return Err(self.mismatch(ty, node));
        };
        let keys = wire_keys(self.codec().config().field_case, ty)
            .map_err(|c| self.invalid(ty, node, c.to_string()))?;
        let Some(index) = keys.iter().position(|k| k == key) else {
            return Err(self.mismatch(ty, node));
        };
        let variant = &def.variants[index];
        let value = self.decode_at_key(key, &variant.ty, inner)?;
        Ok(Data::Variant {
            name: def.name.clone(),
            label: variant.label.clone(),
            value: Box::new(value),
        })
    }
}
