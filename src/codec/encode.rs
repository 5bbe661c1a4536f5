use serde_json::Map;
use tracing::{debug, trace};

use super::scalar::{self, Reject};
use super::{admits, wire_keys, Codec, Path};
use crate::data::{first_duplicate, Data};
use crate::error::{CodecError, Offending, Result};
use crate::json::Json;
use crate::rule::Outcome;
use crate::ty::{EnumTy, Prim, RecordTy, TaggedTy, Ty};

/// One encode call in flight: depth counter and current path.
pub struct Encoder<'c> {
    codec: &'c Codec,
    depth: usize,
    path: Path,
}

impl<'c> Encoder<'c> {
    pub fn new(codec: &'c Codec) -> Self {
        Self { codec, depth: 0, path: Path::default() }
    }

    pub fn codec(&self) -> &'c Codec { self.codec }
    pub fn depth(&self) -> usize { self.depth }

    /// Encodes one nested step. Custom rules call this to recurse.
    pub fn encode(&mut self, ty: &Ty, value: &Data) -> Result<Json> {
        let limit = self.codec.config().max_depth;
        if self.depth >= limit {
            debug!(path = %self.path, limit, "encode depth guard tripped");
            return Err(CodecError::DepthExceeded { path: self.path.to_string(), limit });
        }
        self.depth += 1;
        let out = self.dispatch(ty, value);
        self.depth -= 1;
        out
    }

    /// Same as [`encode`](Self::encode) with `key` appended to the error path.
    pub fn encode_at_key(&mut self, key: &str, ty: &Ty, value: &Data) -> Result<Json> {
        self.path.push_key(key);
        let out = self.encode(ty, value);
        self.path.pop();
        out
    }

    /// Same as [`encode`](Self::encode) with `index` appended to the error path.
    pub fn encode_at_index(&mut self, index: usize, ty: &Ty, value: &Data) -> Result<Json> {
        self.path.push_index(index);
        let out = self.encode(ty, value);
        self.path.pop();
        out
    }

    pub fn mismatch(&self, expected: &Ty, found: &Data) -> CodecError {
        CodecError::TypeMismatch {
            path: self.path.to_string(),
            expected: expected.clone(),
            found: Offending::Data(found.clone()),
        }
    }

    pub fn invalid(&self, ty: &Ty, found: &Data, reason: impl Into<String>) -> CodecError {
        CodecError::Value {
            path: self.path.to_string(),
            ty: ty.clone(),
            found: Offending::Data(found.clone()),
            reason: reason.into(),
        }
    }

    // ---------------------------- Dispatch ---------------------------- //

    fn dispatch(&mut self, ty: &Ty, value: &Data) -> Result<Json> {
        let codec = self.codec;
        for (index, rule) in codec.encode_rules().iter().enumerate() {
            if let Outcome::Accepted(json) = rule.try_encode(self, ty, value)? {
                trace!(rule = index, %ty, path = %self.path, "custom encode rule accepted");
                return Ok(json);
            }
        }
        self.builtin(ty, value)
    }

    fn builtin(&mut self, ty: &Ty, value: &Data) -> Result<Json> {
        match ty {
            Ty::Prim(prim) => self.encode_prim(ty, *prim, value),
            Ty::Union(members) => self.encode_union(ty, members, value),
            Ty::Sequence(item) => match value {
                Data::Seq(items) => self.encode_items(item, items),
                _ => Err(self.mismatch(ty, value)),
            },
            Ty::Set(item) => match value {
                Data::Set(items) => {
                    if let Some(dup) = first_duplicate(items) {
                        return Err(self.invalid(ty, value, format!("duplicate element {}", items[dup])));
                    }
                    self.encode_items(item, items)
                }
                _ => Err(self.mismatch(ty, value)),
            },
            Ty::Tuple(members) => match value {
                Data::Tuple(items) if items.len() == members.len() => {
                    let mut out = Vec::with_capacity(items.len());
                    for (i, (member, item)) in members.iter().zip(items).enumerate() {
                        out.push(self.encode_at_index(i, member, item)?);
                    }
                    Ok(Json::Array(out))
                }
                Data::Tuple(items) => Err(self.invalid(ty, value, format!(
                    "expected a tuple of size {}, found size {}", members.len(), items.len()
                ))),
                _ => Err(self.mismatch(ty, value)),
            },
            Ty::Mapping(value_ty) => match value {
                Data::Map(entries) => {
                    let mut out = Map::new();
                    for (key, entry) in entries {
                        let json = self.encode_at_key(key, value_ty, entry)?;
                        out.insert(key.clone(), json);
                    }
                    Ok(Json::Object(out))
                }
                _ => Err(self.mismatch(ty, value)),
            },
            Ty::Enum(def) => self.encode_enum(ty, def, value),
            Ty::Record(def) => self.encode_record(ty, def, value),
            Ty::Tagged(def) => self.encode_tagged(ty, def, value),
            Ty::Ref(name) => match self.codec().catalog().get(name) {
                Some(def) => self.dispatch(def, value),
                None => Err(self.mismatch(ty, value)),
            },
            Ty::Any => match value {
                Data::Json(json) => Ok(json.clone()),
                other => self.dispatch(&other.infer_ty(), value),
            },
        }
    }

    fn encode_prim(&self, ty: &Ty, prim: Prim, value: &Data) -> Result<Json> {
        scalar::encode(prim, value).map_err(|reject| match reject {
            Reject::Mismatch => self.mismatch(ty, value),
            Reject::Invalid(reason) => self.invalid(ty, value, reason),
        })
    }

    /// Tries, in declared order, every member whose descriptor admits the
    /// value's runtime kind; the first that encodes wins. Shape errors move on
    /// to the next member, anything else propagates.
    fn encode_union(&mut self, ty: &Ty, members: &[Ty], value: &Data) -> Result<Json> {
        if value.is_absent() && members.iter().any(|m| matches!(m, Ty::Prim(Prim::Null))) {
            return Ok(Json::Null);
        }
        let catalog = self.codec().catalog();
        for member in members.iter().filter(|m| admits(catalog, m, value)) {
            match self.dispatch(member, value) {
                Ok(json) => {
                    trace!(%member, path = %self.path, "union member selected for encode");
                    return Ok(json);
                }
                Err(error) if error.is_shape_error() => {
                    debug!(%member, path = %self.path, %error, "union member declined value");
                }
                Err(error) => return Err(error),
            }
        }
        Err(self.mismatch(ty, value))
    }

    fn encode_items(&mut self, item: &Ty, items: &[Data]) -> Result<Json> {
        let mut out = Vec::with_capacity(items.len());
        for (i, x) in items.iter().enumerate() {
            out.push(self.encode_at_index(i, item, x)?);
        }
        Ok(Json::Array(out))
    }

    fn encode_enum(&mut self, ty: &Ty, def: &EnumTy, value: &Data) -> Result<Json> {
        let Data::Enum { name, label } = value else {
            return Err(self.mismatch(ty, value));
        };
        if *name != def.name {
            return Err(self.mismatch(ty, value));
        }
        match def.get(label) {
            Some(member) => self.encode(&member.ty, &member.value),
            None => Err(self.invalid(ty, value, format!("{} has no member `{label}`", def.name))),
        }
    }

    fn encode_record(&mut self, ty: &Ty, def: &RecordTy, value: &Data) -> Result<Json> {
        let Data::Record { name, fields } = value else {
            return Err(self.mismatch(ty, value));
        };
        if *name != def.name {
            return Err(self.mismatch(ty, value));
        }
        if let Some(unknown) = fields.keys().find(|k| def.get(k).is_none()) {
            return Err(self.invalid(ty, value, format!("unknown field `{unknown}`")));
        }

        let config = self.codec().config();
        let keys = wire_keys(config.field_case, ty).map_err(|c| self.invalid(ty, value, c.to_string()))?;
        let mut out = Map::new();
        for (field, key) in def.fields.iter().zip(keys) {
            let current = match (fields.get(&field.name), &field.default) {
                (Some(v), _) => v,
                (None, Some(default)) => default,
                (None, None) if field.ty.admits_absent() => &Data::Absent,
                (None, None) => {
                    return Err(self.invalid(ty, value, format!("missing field `{}`", field.name)));
                }
            };
            if config.omit_defaults && field.default.as_ref() == Some(current) {
                continue;
            }
            let json = self.encode_at_key(&key, &field.ty, current)?;
            out.insert(key, json);
        }
        Ok(Json::Object(out))
    }

    fn encode_tagged(&mut self, ty: &Ty, def: &TaggedTy, value: &Data) -> Result<Json> {
        let Data::Variant { name, label, value: inner } = value else {
            return Err(self.mismatch(ty, value));
        };
        if *name != def.name {
            return Err(self.mismatch(ty, value));
        }
        let Some(index) = def.variants.iter().position(|v| v.label == *label) else {
            return Err(self.invalid(ty, value, format!("{} has no variant `{label}`", def.name)));
        };
        let mut keys = wire_keys(self.codec.config().field_case, ty)
            .map_err(|c| self.invalid(ty, value, c.to_string()))?;
        let variant = &def.variants[index];
        let key = keys.swap_remove(index);
        let json = self.encode_at_key(&key, &variant.ty, inner)?;
        let mut out = Map::new();
        out.insert(key, json);
        Ok(Json::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::encode_fn;
    use crate::ty::RecordTy;
    use serde_json::json;

    fn encode(ty: &Ty, value: &Data) -> Result<Json> {
        Codec::default().encode(ty, value)
    }

    #[test]
    fn tuple_arity_must_match() {
        let ty = Ty::tuple([Ty::int(), Ty::int()]);
        let err = encode(&ty, &Data::tuple([Data::Int(1), Data::Int(2), Data::Int(3)])).unwrap_err();
        assert!(matches!(err, CodecError::Value { .. }), "{err}");
        assert_eq!(encode(&ty, &Data::tuple([Data::Int(1), Data::Int(2)])).unwrap(), json!([1, 2]));
        let err = encode(&ty, &Data::seq([Data::Int(1), Data::Int(2)])).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn union_picks_member_by_runtime_kind() {
        let ty = Ty::union([Ty::text(), Ty::int()]);
        assert_eq!(encode(&ty, &Data::text("bla")).unwrap(), json!("bla"));
        assert_eq!(encode(&ty, &Data::Int(3)).unwrap(), json!(3));
        let err = encode(&ty, &Data::Bool(true)).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn union_falls_through_members_of_the_same_kind() {
        let ty = Ty::union([Ty::sequence(Ty::int()), Ty::sequence(Ty::text())]);
        assert_eq!(encode(&ty, &Data::seq([Data::text("a")])).unwrap(), json!(["a"]));
        assert_eq!(encode(&ty, &Data::seq([Data::Int(1)])).unwrap(), json!([1]));

        let shapes = Ty::union([
            RecordTy::new("R").field("a", Ty::int()).into_ty(),
            RecordTy::new("R").field("a", Ty::text()).into_ty(),
        ]);
        let value = Data::record("R", [("a", Data::text("x"))]);
        assert_eq!(encode(&shapes, &value).unwrap(), json!({"a": "x"}));
    }

    #[test]
    fn optional_absent_is_null() {
        let ty = Ty::optional(Ty::int());
        assert_eq!(encode(&ty, &Data::Absent).unwrap(), json!(null));
        assert_eq!(encode(&ty, &Data::Int(123)).unwrap(), json!(123));
        let err = encode(&Ty::text(), &Data::Absent).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn custom_rule_overrides_builtin_int() {
        let codec = Codec::builder()
            .encode_rule(encode_fn(|_enc, ty, value| match (ty, value) {
                (Ty::Prim(Prim::Int), Data::Int(i)) => Ok(Outcome::Accepted(json!(i.to_string()))),
                _ => Ok(Outcome::Declined),
            }))
            .build()
            .unwrap();
        let value = Data::seq([Data::Int(3), Data::Int(4), Data::Int(5)]);
        assert_eq!(codec.encode(&Ty::sequence(Ty::int()), &value).unwrap(), json!(["3", "4", "5"]));
        // untyped encoding goes through the same rule
        assert_eq!(codec.encode_inferred(&value).unwrap(), json!(["3", "4", "5"]));
    }

    #[test]
    fn rules_run_in_registration_order() {
        let codec = Codec::builder()
            .encode_rule(encode_fn(|_, _, _| Ok(Outcome::Declined)))
            .encode_rule(encode_fn(|_, _, _| Ok(Outcome::Accepted(json!("first")))))
            .encode_rule(encode_fn(|_, _, _| Ok(Outcome::Accepted(json!("second")))))
            .build()
            .unwrap();
        assert_eq!(codec.encode(&Ty::int(), &Data::Int(1)).unwrap(), json!("first"));
    }

    #[test]
    fn rule_errors_propagate() {
        let codec = Codec::builder()
            .encode_rule(encode_fn(|enc, ty, value| Err(enc.invalid(ty, value, "refused"))))
            .build()
            .unwrap();
        let err = codec.encode(&Ty::int(), &Data::Int(1)).unwrap_err();
        assert!(matches!(err, CodecError::Value { ref reason, .. } if reason == "refused"));
    }

    #[test]
    fn record_fields_in_declared_order() {
        let ty = RecordTy::new("TheClass")
            .field("string_field", Ty::text())
            .field("int_field", Ty::int())
            .into_ty();
        let value = Data::record("TheClass", [
            ("int_field", Data::Int(123)),
            ("string_field", Data::text("bla")),
        ]);
        let json = encode(&ty, &value).unwrap();
        assert_eq!(json.to_string(), r#"{"string_field":"bla","int_field":123}"#);

        let wrong = Data::record("TheClass", [
            ("string_field", Data::text("bla")),
            ("int_field", Data::text("wrong")),
        ]);
        let err = encode(&ty, &wrong).unwrap_err();
        assert_eq!(err.path(), Some("/int_field"));
    }

    #[test]
    fn record_missing_and_unknown_fields() {
        let ty = RecordTy::new("R")
            .field("a", Ty::int())
            .field("b", Ty::optional(Ty::int()))
            .into_ty();
        assert_eq!(
            encode(&ty, &Data::record("R", [("a", Data::Int(1))])).unwrap(),
            json!({"a": 1, "b": null}),
        );
        let err = encode(&ty, &Data::record("R", [("b", Data::Int(1))])).unwrap_err();
        assert!(matches!(err, CodecError::Value { ref reason, .. } if reason.contains("`a`")));
        let err = encode(&ty, &Data::record("R", [("a", Data::Int(1)), ("zzz", Data::Int(1))])).unwrap_err();
        assert!(matches!(err, CodecError::Value { ref reason, .. } if reason.contains("zzz")));
        let err = encode(&ty, &Data::record("Other", [("a", Data::Int(1))])).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn set_with_duplicates_is_rejected() {
        let err = encode(&Ty::set(Ty::int()), &Data::Set(vec![Data::Int(1), Data::Int(1)])).unwrap_err();
        assert!(matches!(err, CodecError::Value { .. }));
    }

    #[test]
    fn any_passes_json_through_and_infers_the_rest() {
        assert_eq!(encode(&Ty::Any, &Data::Json(json!({"x": [1]}))).unwrap(), json!({"x": [1]}));
        assert_eq!(encode(&Ty::Any, &Data::text("bla")).unwrap(), json!("bla"));
    }
}
