//! Named definitions, looked up by `Ty::Ref`.
use indexmap::IndexMap;

use crate::error::{CodecError, Result};
use crate::ty::Ty;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    defs: IndexMap<String, Ty>,
}

impl Catalog {
    pub fn new() -> Self { Self::default() }

    /// Registers a record, enum or tagged-union definition under its declared
    /// name, replacing any previous definition with that name.
    pub fn define(&mut self, ty: Ty) -> Result<()> {
        let name = match &ty {
            Ty::Record(def) => def.name.clone(),
            Ty::Enum(def) => def.name.clone(),
            Ty::Tagged(def) => def.name.clone(),
            other => {
                return Err(CodecError::Schema(format!(
                    "only records, enums and tagged unions can be named, got {other}"
                )));
            }
        };
        self.defs.insert(name, ty);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Ty> {
        self.defs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.defs.len() }
    pub fn is_empty(&self) -> bool { self.defs.is_empty() }
}
