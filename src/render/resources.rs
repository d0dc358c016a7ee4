//! Per-stream resource table
//!
//! Every object a stream references by name goes through [`ResourceTable::intern`],
//! which hands out `F0`, `Im0`, `P0`, ... in insertion order and returns the
//! existing name when the same object is interned again.

use crate::object::{Dict, ObjectId, PdfObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceCategory {
    Font,
    Image,
    Form,
    Pattern,
    Shading,
    ExtGState,
}

impl ResourceCategory {
    /// Name prefix of resources in this category
    pub fn prefix(self) -> &'static str {
        match self {
            ResourceCategory::Font => "F",
            ResourceCategory::Image => "Im",
            ResourceCategory::Form => "Fm",
            ResourceCategory::Pattern => "P",
            ResourceCategory::Shading => "Sh",
            ResourceCategory::ExtGState => "Gs",
        }
    }

    /// Key of the sub-dictionary in `/Resources`
    pub fn dict_key(self) -> &'static str {
        match self {
            ResourceCategory::Font => "Font",
            ResourceCategory::Image | ResourceCategory::Form => "XObject",
            ResourceCategory::Pattern => "Pattern",
            ResourceCategory::Shading => "Shading",
            ResourceCategory::ExtGState => "ExtGState",
        }
    }

    const ALL: [ResourceCategory; 6] = [
        ResourceCategory::Font,
        ResourceCategory::Image,
        ResourceCategory::Form,
        ResourceCategory::Pattern,
        ResourceCategory::Shading,
        ResourceCategory::ExtGState,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub category: ResourceCategory,
    pub name: String,
    pub id: ObjectId,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    entries: Vec<ResourceEntry>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of `id` in `category`, assigning the next free one on first use
    pub fn intern(&mut self, category: ResourceCategory, id: ObjectId) -> String {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.category == category && e.id == id)
        {
            return entry.name.clone();
        }
        let index = self.entries.iter().filter(|e| e.category == category).count();
        let name = format!("{}{}", category.prefix(), index);
        crate::log::trace!(?category, %name, id = id.0, "resource interned");
        self.entries.push(ResourceEntry {
            category,
            name: name.clone(),
            id,
        });
        name
    }

    pub fn get(&self, category: ResourceCategory, id: ObjectId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.category == category && e.id == id)
            .map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `/Resources` dictionary of the stream
    pub fn to_dict(&self) -> Dict {
        let mut resources = Dict::new();
        for category in ResourceCategory::ALL {
            let mut sub = match resources.get(category.dict_key()) {
                Some(PdfObject::Dict(existing)) => existing.clone(),
                _ => Dict::new(),
            };
            for entry in self.entries.iter().filter(|e| e.category == category) {
                sub.set(&entry.name, entry.id);
            }
            if !sub.is_empty() {
                resources.set(category.dict_key(), sub);
            }
        }
        resources
    }
}
