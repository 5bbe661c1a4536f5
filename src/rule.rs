//! Pluggable encode/decode rules consulted before the built-in ones.
//!
//! A rule either produces a result, declines (`Outcome::Declined`, meaning
//! "not applicable, try the next rule"), or fails hard with an error that
//! propagates to the caller. Rules receive the live session so they can
//! recurse into nested descriptors with depth and path tracking intact.
use crate::codec::{Decoder, Encoder};
use crate::data::Data;
use crate::error::Result;
use crate::json::Json;
use crate::ty::Ty;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Accepted(T),
    Declined,
}

pub trait EncodeRule: Send + Sync {
    fn try_encode(&self, enc: &mut Encoder<'_>, ty: &Ty, value: &Data) -> Result<Outcome<Json>>;
}

pub trait DecodeRule: Send + Sync {
    fn try_decode(&self, dec: &mut Decoder<'_>, ty: &Ty, node: &Json) -> Result<Outcome<Data>>;
}

/// Ordered rules for one direction, iterated strictly in registration order.
pub struct RuleChain<R: ?Sized> {
    rules: Vec<Box<R>>,
}

impl<R: ?Sized> RuleChain<R> {
    pub fn new() -> Self { Self { rules: Vec::new() } }

    pub fn register(&mut self, rule: Box<R>) {
        self.rules.push(rule);
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.rules.iter().map(|r| &**r)
    }

    pub fn len(&self) -> usize { self.rules.len() }
    pub fn is_empty(&self) -> bool { self.rules.is_empty() }
}

impl<R: ?Sized> Default for RuleChain<R> {
    fn default() -> Self { Self::new() }
}

// ---------------------------- Closure adapters ---------------------------- //

pub struct EncodeFn<F>(F);
pub struct DecodeFn<F>(F);

/// Wraps a closure as an [`EncodeRule`].
pub fn encode_fn<F>(f: F) -> EncodeFn<F>
where
    F: Fn(&mut Encoder<'_>, &Ty, &Data) -> Result<Outcome<Json>> + Send + Sync,
{
    EncodeFn(f)
}

/// Wraps a closure as a [`DecodeRule`].
pub fn decode_fn<F>(f: F) -> DecodeFn<F>
where
    F: Fn(&mut Decoder<'_>, &Ty, &Json) -> Result<Outcome<Data>> + Send + Sync,
{
    DecodeFn(f)
}

impl<F> EncodeRule for EncodeFn<F>
where
    F: Fn(&mut Encoder<'_>, &Ty, &Data) -> Result<Outcome<Json>> + Send + Sync,
{
    fn try_encode(&self, enc: &mut Encoder<'_>, ty: &Ty, value: &Data) -> Result<Outcome<Json>> {
        (self.0)(enc, ty, value)
    }
}

impl<F> DecodeRule for DecodeFn<F>
where
    F: Fn(&mut Decoder<'_>, &Ty, &Json) -> Result<Outcome<Data>> + Send + Sync,
{
    fn try_decode(&self, dec: &mut Decoder<'_>, ty: &Ty, node: &Json) -> Result<Outcome<Data>> {
        (self.0)(dec, ty, node)
    }
}
