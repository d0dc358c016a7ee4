//! Minimal PDF object values handed to the document collaborator.
//!
//! The renderer never serializes a file. It only describes the dictionaries
//! and streams it needs (patterns, shadings, forms, graphics states) so the
//! collaborator can register them under an [`ObjectId`].

use std::fmt;

use crate::render::fmt::fmt_num;

/// Identity of an indirect object, as allocated by the document collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 0 R", self.0)
    }
}

/// A PDF value
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Name(String),
    String(String),
    HexString(Vec<u8>),
    Array(Vec<PdfObject>),
    Dict(Dict),
    Ref(ObjectId),
    Stream { dict: Dict, data: Vec<u8> },
}

impl PdfObject {
    pub fn name(name: impl Into<String>) -> Self {
        PdfObject::Name(name.into())
    }

    pub fn reals(values: &[f64]) -> Self {
        PdfObject::Array(values.iter().map(|v| PdfObject::Real(*v)).collect())
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            PdfObject::Dict(d) | PdfObject::Stream { dict: d, .. } => Some(d),
            _ => None,
        }
    }

    pub fn as_ref_id(&self) -> Option<ObjectId> {
        match self {
            PdfObject::Ref(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PdfObject]> {
        match self {
            PdfObject::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PdfObject::Int(i) => Some(*i as f64),
            PdfObject::Real(r) => Some(*r),
            _ => None,
        }
    }
}

impl From<Dict> for PdfObject {
    fn from(d: Dict) -> Self {
        PdfObject::Dict(d)
    }
}

impl From<ObjectId> for PdfObject {
    fn from(id: ObjectId) -> Self {
        PdfObject::Ref(id)
    }
}

/// Dictionary preserving insertion order, keys without the leading slash
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    entries: Vec<(String, PdfObject)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<PdfObject>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace
    pub fn set(&mut self, key: &str, value: impl Into<PdfObject>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PdfObject)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<bool> for PdfObject {
    fn from(v: bool) -> Self {
        PdfObject::Bool(v)
    }
}

impl From<i64> for PdfObject {
    fn from(v: i64) -> Self {
        PdfObject::Int(v)
    }
}

impl From<f64> for PdfObject {
    fn from(v: f64) -> Self {
        PdfObject::Real(v)
    }
}

impl From<Vec<PdfObject>> for PdfObject {
    fn from(v: Vec<PdfObject>) -> Self {
        PdfObject::Array(v)
    }
}

impl fmt::Display for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<<")?;
        for (key, value) in &self.entries {
            write!(f, " /{key} {value}")?;
        }
        write!(f, " >>")
    }
}

impl fmt::Display for PdfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfObject::Null => write!(f, "null"),
            PdfObject::Bool(b) => write!(f, "{b}"),
            PdfObject::Int(i) => write!(f, "{i}"),
            PdfObject::Real(r) => write!(f, "{}", fmt_num(*r, 5)),
            PdfObject::Name(n) => write!(f, "/{n}"),
            PdfObject::String(s) => {
                write!(f, "(")?;
                for c in s.chars() {
                    match c {
                        '(' | ')' | '\\' => write!(f, "\\{c}")?,
                        _ => write!(f, "{c}")?,
                    }
                }
                write!(f, ")")
            }
            PdfObject::HexString(bytes) => {
                write!(f, "<")?;
                for byte in bytes {
                    write!(f, "{byte:02X}")?;
                }
                write!(f, ">")
            }
            PdfObject::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            PdfObject::Dict(d) => write!(f, "{d}"),
            PdfObject::Ref(id) => write!(f, "{id}"),
            PdfObject::Stream { dict, data } => {
                write!(f, "{dict}\nstream\n{}\nendstream", String::from_utf8_lossy(data))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_set_replaces_existing_key() {
        let mut d = Dict::new().with("Type", PdfObject::name("Pattern"));
        d.set("Type", PdfObject::name("XObject"));
        assert_eq!(d.len(), 1);
        assert_eq!(d.get("Type").and_then(PdfObject::as_name), Some("XObject"));
    }

    #[test]
    fn display_uses_pdf_syntax() {
        let d = Dict::new()
            .with("ShadingType", 2i64)
            .with("Coords", PdfObject::reals(&[0.0, 0.5, 1.0, 0.25]))
            .with("Extend", PdfObject::Array(vec![true.into(), false.into()]))
            .with("Function", ObjectId(7));
        assert_eq!(
            d.to_string(),
            "<< /ShadingType 2 /Coords [0 0.5 1 0.25] /Extend [true false] /Function 7 0 R >>"
        );
    }

    #[test]
    fn strings_are_escaped() {
        let s = PdfObject::String("a(b)\\".into());
        assert_eq!(s.to_string(), "(a\\(b\\)\\\\)");
        assert_eq!(PdfObject::HexString(vec![0, 0x2a]).to_string(), "<002A>");
    }
}
