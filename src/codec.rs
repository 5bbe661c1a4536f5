//! The type-directed dispatch engine.
//!
//! A [`Codec`] owns the rule chains, the named-type catalog and the
//! configuration; it is immutable after [`CodecBuilder::build`] and can be
//! shared across threads. Every top-level call opens a short-lived session
//! ([`Encoder`] / [`Decoder`]) that tracks recursion depth and the JSON path
//! used in diagnostics.
//!
//! Dispatch for one `(descriptor, value)` step:
//! 1. custom rules in registration order; the first `Accepted` wins,
//! 2. otherwise the built-in rule for the descriptor's tag.
pub mod decode;
pub mod encode;
mod scalar;

use std::fmt;
use std::io::{Read, Write};

use crate::case::{Collision, FieldCase};
use crate::catalog::Catalog;
use crate::config::CodecConfig;
use crate::data::Data;
use crate::error::{CodecError, Result};
use crate::json::{self, Json};
use crate::rule::{DecodeRule, EncodeRule, RuleChain};
use crate::ty::Ty;

pub use decode::Decoder;
pub use encode::Encoder;

pub struct Codec {
    encode_rules: RuleChain<dyn EncodeRule>,
    decode_rules: RuleChain<dyn DecodeRule>,
    catalog: Catalog,
    config: CodecConfig,
}

#[derive(Default)]
pub struct CodecBuilder {
    encode_rules: RuleChain<dyn EncodeRule>,
    decode_rules: RuleChain<dyn DecodeRule>,
    catalog: Catalog,
    pending: Vec<Ty>,
    config: CodecConfig,
}

impl Codec {
    pub fn builder() -> CodecBuilder { CodecBuilder::default() }

    pub fn catalog(&self) -> &Catalog { &self.catalog }
    pub fn config(&self) -> &CodecConfig { &self.config }
    pub fn encode_rules(&self) -> &RuleChain<dyn EncodeRule> { &self.encode_rules }
    pub fn decode_rules(&self) -> &RuleChain<dyn DecodeRule> { &self.decode_rules }

    /// Structured value → JSON tree.
    pub fn encode(&self, ty: &Ty, value: &Data) -> Result<Json> {
        Encoder::new(self).encode(ty, value)
    }

    /// Encodes against the descriptor the value reports for itself.
    pub fn encode_inferred(&self, value: &Data) -> Result<Json> {
        self.encode(&value.infer_ty(), value)
    }

    /// JSON tree → structured value.
    pub fn decode(&self, ty: &Ty, node: &Json) -> Result<Data> {
        Decoder::new(self).decode(ty, node)
    }

    pub fn encode_to_text(&self, value: &Data, ty: Option<&Ty>) -> Result<String> {
        let tree = self.encode_optionally_typed(value, ty)?;
        json::render(&tree, self.config.indent)
    }

    pub fn encode_to_stream<W: Write>(&self, sink: W, value: &Data, ty: Option<&Ty>) -> Result<()> {
        let tree = self.encode_optionally_typed(value, ty)?;
        json::render_to(sink, &tree, self.config.indent)
    }

    pub fn decode_from_text(&self, ty: &Ty, text: &str) -> Result<Data> {
        self.decode(ty, &json::parse(text)?)
    }

    pub fn decode_from_stream<R: Read>(&self, source: R, ty: &Ty) -> Result<Data> {
        self.decode(ty, &json::parse_reader(source)?)
    }

    fn encode_optionally_typed(&self, value: &Data, ty: Option<&Ty>) -> Result<Json> {
        match ty {
            Some(ty) => self.encode(ty, value),
            None => self.encode_inferred(value),
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            encode_rules: RuleChain::new(),
            decode_rules: RuleChain::new(),
            catalog: Catalog::new(),
            config: CodecConfig::default(),
        }
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("encode_rules", &self.encode_rules.len())
            .field("decode_rules", &self.decode_rules.len())
            .field("catalog", &self.catalog.names().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl CodecBuilder {
    /// Appends an encode rule; rules run in the order they were added.
    pub fn encode_rule(mut self, rule: impl EncodeRule + 'static) -> Self {
        self.encode_rules.register(Box::new(rule));
        self
    }

    /// Appends a decode rule; rules run in the order they were added.
    pub fn decode_rule(mut self, rule: impl DecodeRule + 'static) -> Self {
        self.decode_rules.register(Box::new(rule));
        self
    }

    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Adds a named definition; checked in [`build`](Self::build).
    pub fn define(mut self, ty: Ty) -> Self {
        self.pending.push(ty);
        self
    }

    pub fn config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Codec> {
        self.config.validate()?;
        let mut catalog = self.catalog;
        for ty in self.pending {
            catalog.define(ty)?;
        }
        for name in catalog.names() {
            if let Some(def) = catalog.get(name) {
                wire_keys(self.config.field_case, def)
                    .map_err(|collision| CodecError::Config(format!("{name}: {collision}")))?;
            }
        }
        Ok(Codec {
            encode_rules: self.encode_rules,
            decode_rules: self.decode_rules,
            catalog,
            config: self.config,
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SESSION HELPERS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

/// JSON-pointer style location of the step being processed.
#[derive(Debug, Clone, Default)]
pub(crate) struct Path(Vec<Segment>);

impl Path {
    fn push_key(&mut self, key: impl Into<String>) { self.0.push(Segment::Key(key.into())); }
    fn push_index(&mut self, index: usize) { self.0.push(Segment::Index(index)); }
    fn pop(&mut self) { self.0.pop(); }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.0 {
            match seg {
                Segment::Key(k) => write!(f, "/{}", k.replace('~', "~0").replace('/', "~1"))?,
                Segment::Index(i) => write!(f, "/{i}")?,
            }
        }
        Ok(())
    }
}

/// Wire keys of a record's fields or a tagged union's labels, in declared
/// order; empty for every other descriptor.
pub(crate) fn wire_keys(case: FieldCase, ty: &Ty) -> std::result::Result<Vec<String>, Collision> {
    match ty {
        Ty::Record(def) => case.wire_keys(def.fields.iter().map(|f| f.name.as_str())),
        Ty::Tagged(def) => case.wire_keys(def.variants.iter().map(|v| v.label.as_str())),
        _ => Ok(Vec::new()),
    }
}

/// Whether `ty` accepts a value of this runtime kind; the encode-side union
/// check. Only tags are compared (named values by declared name), the chosen
/// member then validates the contents.
pub(crate) fn admits(catalog: &Catalog, ty: &Ty, value: &Data) -> bool {
    match (ty, value) {
        (Ty::Any, _) => true,
        (Ty::Prim(p), v) => p.kind() == v.kind(),
        (Ty::Union(members), v) => members.iter().any(|m| admits(catalog, m, v)),
        (Ty::Sequence(_), Data::Seq(_))
        | (Ty::Set(_), Data::Set(_))
        | (Ty::Tuple(_), Data::Tuple(_))
        | (Ty::Mapping(_), Data::Map(_)) => true,
        (Ty::Enum(def), Data::Enum { name, .. }) => def.name == *name,
        (Ty::Record(def), Data::Record { name, .. }) => def.name == *name,
        (Ty::Tagged(def), Data::Variant { name, .. }) => def.name == *name,
        (Ty::Ref(name), v) => match catalog.get(name) {
            Some(def) => admits(catalog, def, v),
            None => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::{EnumTy, RecordTy, TaggedTy};
    use chrono::NaiveDate;
    use serde_json::json;
    use uuid::Uuid;

    fn round_trip(codec: &Codec, ty: &Ty, value: Data, wire: Json) {
        assert_eq!(codec.encode(ty, &value).unwrap(), wire, "encode {ty}");
        assert_eq!(codec.decode(ty, &wire).unwrap(), value, "decode {ty}");
    }

    #[test]
    fn codec_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Codec>();
    }

    #[test]
    fn containers_round_trip() {
        let codec = Codec::default();
        round_trip(&codec, &Ty::sequence(Ty::int()), Data::seq([Data::Int(1), Data::Int(2)]), json!([1, 2]));
        round_trip(
            &codec,
            &Ty::mapping(Ty::optional(Ty::text())),
            Data::map([("a", Data::text("x")), ("b", Data::Absent)]),
            json!({"a": "x", "b": null}),
        );
        round_trip(
            &codec,
            &Ty::tuple([Ty::date(), Ty::uuid()]),
            Data::tuple([
                Data::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
                Data::Uuid(Uuid::nil()),
            ]),
            json!(["2020-01-01", "00000000-0000-0000-0000-000000000000"]),
        );
    }

    #[test]
    fn union_member_order_decides_int_versus_float() {
        let codec = Codec::default();
        let int_first = Ty::union([Ty::int(), Ty::float()]);
        let float_first = Ty::union([Ty::float(), Ty::int()]);
        assert_eq!(codec.decode(&int_first, &json!(3)).unwrap(), Data::Int(3));
        assert_eq!(codec.decode(&float_first, &json!(3)).unwrap(), Data::float(3.0));
        // encoding goes by the value's own kind, not by order
        assert_eq!(codec.encode(&float_first, &Data::Int(3)).unwrap(), json!(3));
    }

    #[test]
    fn union_round_trips_when_members_share_a_kind() {
        let codec = Codec::default();
        let seqs = Ty::union([Ty::sequence(Ty::int()), Ty::sequence(Ty::text())]);
        let decoded = codec.decode(&seqs, &json!(["a"])).unwrap();
        assert_eq!(decoded, Data::seq([Data::text("a")]));
        assert_eq!(codec.encode(&seqs, &decoded).unwrap(), json!(["a"]));

        let tuples = Ty::union([Ty::tuple([Ty::int(), Ty::int()]), Ty::tuple([Ty::int(), Ty::int(), Ty::int()])]);
        round_trip(&codec, &tuples, Data::tuple([Data::Int(1), Data::Int(2), Data::Int(3)]), json!([1, 2, 3]));

        let err = codec.encode(&seqs, &Data::seq([Data::Bool(true)])).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { ref path, .. } if path == "/"), "{err}");
    }

    #[test]
    fn union_trial_keeps_hard_errors() {
        let config = CodecConfig { max_depth: 2, ..Default::default() };
        let codec = Codec::builder().config(config).build().unwrap();
        let nested = Ty::union([Ty::sequence(Ty::sequence(Ty::int())), Ty::sequence(Ty::text())]);
        let value = Data::seq([Data::seq([Data::Int(1)])]);
        let err = codec.encode(&nested, &value).unwrap_err();
        assert!(matches!(err, CodecError::DepthExceeded { limit: 2, .. }), "{err}");
    }

    #[test]
    fn mapping_keys_keep_insertion_order() {
        let codec = Codec::default();
        let text = codec
            .encode_to_text(&Data::map([("z", Data::Int(1)), ("a", Data::Int(2))]), None)
            .unwrap();
        assert_eq!(text, r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn enums_by_member_value() {
        let color = EnumTy::new("Color")
            .member("RED", Ty::text(), Data::text("r"))
            .member("BLUE", Ty::text(), Data::text("b"))
            .into_ty();
        let shape = EnumTy::new("Shape")
            .member("SQUARE", Ty::int(), Data::Int(1))
            .member("CIRCLE", Ty::int(), Data::Int(2))
            .into_ty();
        let codec = Codec::default();
        round_trip(&codec, &color, Data::member("Color", "BLUE"), json!("b"));
        round_trip(&codec, &shape, Data::member("Shape", "CIRCLE"), json!(2));
        assert!(matches!(codec.decode(&color, &json!("w")), Err(CodecError::Value { .. })));
        assert!(matches!(
            codec.encode(&color, &Data::member("Shape", "SQUARE")),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    fn linked_node() -> Ty {
        RecordTy::new("Node")
            .field("value", Ty::int())
            .field("next", Ty::optional(Ty::reference("Node")))
            .into_ty()
    }

    fn chain(len: usize) -> Data {
        (0..len).rev().fold(Data::Absent, |next, i| {
            Data::record("Node", [("value", Data::Int(i as i64)), ("next", next)])
        })
    }

    fn chain_json(len: usize) -> Json {
        (0..len).rev().fold(Json::Null, |next, i| json!({"value": i, "next": next}))
    }

    #[test]
    fn self_referential_record_through_catalog() {
        let codec = Codec::builder().define(linked_node()).build().unwrap();
        let ty = Ty::reference("Node");
        round_trip(&codec, &ty, chain(3), chain_json(3));
        // named values infer a reference, so no descriptor is needed on encode
        assert_eq!(codec.encode_inferred(&chain(3)).unwrap(), chain_json(3));
    }

    #[test]
    fn depth_guard_stops_deep_nesting() {
        let config = CodecConfig { max_depth: 8, ..Default::default() };
        let codec = Codec::builder().define(linked_node()).config(config).build().unwrap();
        let ty = Ty::reference("Node");

        assert!(codec.decode(&ty, &chain_json(3)).is_ok());
        assert!(codec.encode(&ty, &chain(3)).is_ok());

        let err = codec.decode(&ty, &chain_json(10)).unwrap_err();
        assert!(matches!(err, CodecError::DepthExceeded { limit: 8, .. }), "{err}");
        let err = codec.encode(&ty, &chain(10)).unwrap_err();
        assert!(matches!(err, CodecError::DepthExceeded { limit: 8, .. }), "{err}");
    }

    #[test]
    fn unknown_reference_is_a_mismatch() {
        let codec = Codec::default();
        let err = codec.decode(&Ty::reference("Nowhere"), &json!({})).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn snake_case_applies_to_fields_and_variant_labels() {
        let config = CodecConfig { field_case: FieldCase::SnakeCase, ..Default::default() };
        let codec = Codec::builder().config(config).build().unwrap();

        let record = RecordTy::new("Example")
            .field("StringField", Ty::text())
            .field("intField", Ty::int())
            .into_ty();
        round_trip(
            &codec,
            &record,
            Data::record("Example", [("StringField", Data::text("a")), ("intField", Data::Int(1))]),
            json!({"string_field": "a", "int_field": 1}),
        );

        let tagged = TaggedTy::new("A").variant("Number", Ty::int()).into_ty();
        round_trip(&codec, &tagged, Data::variant("A", "Number", Data::Int(3)), json!({"number": 3}));
        assert!(codec.decode(&tagged, &json!({"Number": 3})).is_err());
    }

    #[test]
    fn omit_defaults_drops_matching_fields() {
        let config = CodecConfig { omit_defaults: true, ..Default::default() };
        let codec = Codec::builder().config(config).build().unwrap();
        let ty = RecordTy::new("Page")
            .field("title", Ty::text())
            .field_with_default("size", Ty::int(), Data::Int(20))
            .into_ty();
        let value = Data::record("Page", [("title", Data::text("x")), ("size", Data::Int(20))]);
        round_trip(&codec, &ty, value, json!({"title": "x"}));
    }

    #[test]
    fn text_and_stream_entry_points() {
        let config = CodecConfig { indent: Some(2), ..Default::default() };
        let codec = Codec::builder().config(config).build().unwrap();
        let ty = Ty::sequence(Ty::int());
        let value = Data::seq([Data::Int(1), Data::Int(2)]);

        let text = codec.encode_to_text(&value, Some(&ty)).unwrap();
        assert_eq!(text, "[\n  1,\n  2\n]");
        assert_eq!(codec.decode_from_text(&ty, &text).unwrap(), value);

        let mut sink = Vec::new();
        codec.encode_to_stream(&mut sink, &value, Some(&ty)).unwrap();
        assert_eq!(codec.decode_from_stream(sink.as_slice(), &ty).unwrap(), value);

        assert!(matches!(codec.decode_from_text(&ty, "[1,"), Err(CodecError::Parse(_))));
    }

    #[test]
    fn builder_rejects_bad_config_and_definitions() {
        let config = CodecConfig { max_depth: 0, ..Default::default() };
        assert!(matches!(Codec::builder().config(config).build(), Err(CodecError::Config(_))));
        assert!(matches!(Codec::builder().define(Ty::int()).build(), Err(CodecError::Schema(_))));
    }

    #[test]
    fn colliding_wire_keys_are_rejected() {
        let record = RecordTy::new("Clash").field("fooBar", Ty::int()).field("foo_bar", Ty::int()).into_ty();
        let snake = CodecConfig { field_case: FieldCase::SnakeCase, ..Default::default() };

        let err = Codec::builder().define(record.clone()).config(snake.clone()).build().unwrap_err();
        assert!(matches!(err, CodecError::Config(ref msg) if msg.contains("fooBar") && msg.contains("foo_bar")), "{err}");
        assert!(Codec::builder().define(record.clone()).build().is_ok());

        // inline definitions never reach the builder, so the check happens per call
        let codec = Codec::builder().config(snake).build().unwrap();
        let value = Data::record("Clash", [("fooBar", Data::Int(1)), ("foo_bar", Data::Int(2))]);
        assert!(matches!(codec.encode(&record, &value), Err(CodecError::Value { .. })));
        assert!(matches!(codec.decode(&record, &json!({"foo_bar": 2})), Err(CodecError::Value { .. })));

        let tagged = TaggedTy::new("T").variant("Num", Ty::int()).variant("num", Ty::text()).into_ty();
        assert!(matches!(codec.decode(&tagged, &json!({"num": 1})), Err(CodecError::Value { .. })));
        assert!(matches!(
            codec.encode(&tagged, &Data::variant("T", "Num", Data::Int(1))),
            Err(CodecError::Value { .. })
        ));
    }

    #[test]
    fn json_pointer_escapes() {
        let mut path = Path::default();
        assert_eq!(path.to_string(), "/");
        path.push_key("a/b");
        path.push_index(2);
        path.push_key("~x");
        assert_eq!(path.to_string(), "/a~1b/2/~0x");
    }
}
