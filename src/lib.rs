//! Type-directed JSON encoding and decoding.
//!
//! A [`Ty`] descriptor steers every step: [`Codec::encode`] turns a
//! structured [`Data`] value into a JSON tree and [`Codec::decode`] turns a
//! JSON tree back into `Data`, consulting custom rules before the built-in
//! ones. Named records, enums and tagged unions live in a [`Catalog`] and are
//! referenced with [`Ty::Ref`], which is also how recursive types are spelled.
//!
//! ```no_run
//! use typjson::{Codec, Data, RecordTy, Ty};
//!
//! let address = RecordTy::new("Address")
//!     .field("street", Ty::text())
//!     .field("apt", Ty::optional(Ty::text()))
//!     .into_ty();
//! let codec = Codec::default();
//! let data = codec.decode_from_text(&address, r#"{"street": "Main"}"#)?;
//! assert_eq!(codec.encode_to_text(&data, Some(&address))?, r#"{"street":"Main","apt":null}"#);
//! # Ok::<(), typjson::CodecError>(())
//! ```
pub mod case;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod data;
pub mod error;
pub mod json;
pub mod rule;
pub mod schema;
pub mod ty;
pub mod typed;

use std::io::{Read, Write};

use once_cell::sync::Lazy;

pub use case::{Collision, FieldCase};
pub use catalog::Catalog;
pub use codec::{Codec, CodecBuilder, Decoder, Encoder};
pub use config::CodecConfig;
pub use data::{Data, Kind};
pub use error::{CodecError, Offending, Result};
pub use json::Json;
pub use rule::{decode_fn, encode_fn, DecodeRule, EncodeRule, Outcome};
pub use schema::{Schema, SchemaDoc};
pub use ty::{EnumTy, Prim, RecordTy, TaggedTy, Ty};
pub use typed::{Describe, FromData, ToData};

static DEFAULT_CODEC: Lazy<Codec> = Lazy::new(Codec::default);

/// No custom rules, empty catalog, default configuration.
pub fn default_codec() -> &'static Codec {
    &DEFAULT_CODEC
}

pub fn encode_to_text(value: &Data, ty: Option<&Ty>) -> Result<String> {
    DEFAULT_CODEC.encode_to_text(value, ty)
}

pub fn encode_to_stream<W: Write>(sink: W, value: &Data, ty: Option<&Ty>) -> Result<()> {
    DEFAULT_CODEC.encode_to_stream(sink, value, ty)
}

pub fn decode_from_text(ty: &Ty, text: &str) -> Result<Data> {
    DEFAULT_CODEC.decode_from_text(ty, text)
}

pub fn decode_from_stream<R: Read>(source: R, ty: &Ty) -> Result<Data> {
    DEFAULT_CODEC.decode_from_stream(source, ty)
}
