//! Interfaces to the collaborators the renderer depends on.
//!
//! The renderer never owns the document: it allocates object ids, registers
//! the dictionaries and streams it synthesizes, and asks resolvers for fonts
//! and images. The `Memory*` types are plain in-memory implementations used
//! by the tests and by callers that only need the emitted objects.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::object::{ObjectId, PdfObject};

// ============================================================================
// Document objects
// ============================================================================

/// Indirect object allocation and registration
pub trait DocumentObjects {
    /// Reserve a fresh object id
    fn allocate(&mut self) -> ObjectId;

    /// Attach the value of a previously allocated object
    fn register(&mut self, id: ObjectId, object: PdfObject);

    /// Record that `glyph` of `font` was laid out, for subsetting.
    ///
    /// `text` is the source text of the glyph's cluster, empty for glyphs
    /// that continue a multi-glyph cluster.
    fn record_glyph(&mut self, font: ObjectId, glyph: u16, text: &str);
}

/// Document collaborator that keeps everything in memory
#[derive(Debug, Default)]
pub struct MemoryDocument {
    next_id: u32,
    objects: BTreeMap<ObjectId, PdfObject>,
    glyphs: HashMap<ObjectId, BTreeMap<u16, String>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        MemoryDocument {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Reserve ids up to `first - 1` so allocation starts at `first`
    pub fn starting_at(first: u32) -> Self {
        MemoryDocument {
            next_id: first,
            ..Default::default()
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&PdfObject> {
        self.objects.get(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &PdfObject)> {
        self.objects.iter().map(|(id, obj)| (*id, obj))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Decoded data of a registered stream object
    pub fn stream_text(&self, id: ObjectId) -> Option<String> {
        match self.objects.get(&id)? {
            PdfObject::Stream { data, .. } => Some(String::from_utf8_lossy(data).into_owned()),
            _ => None,
        }
    }

    /// Glyph ids recorded for `font`, sorted
    pub fn used_glyphs(&self, font: ObjectId) -> BTreeSet<u16> {
        self.glyphs
            .get(&font)
            .map(|g| g.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Source text recorded for one glyph
    pub fn glyph_text(&self, font: ObjectId, glyph: u16) -> Option<&str> {
        self.glyphs.get(&font)?.get(&glyph).map(String::as_str)
    }
}

impl DocumentObjects for MemoryDocument {
    fn allocate(&mut self) -> ObjectId {
        if self.next_id == 0 {
            self.next_id = 1;
        }
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    fn register(&mut self, id: ObjectId, object: PdfObject) {
        self.objects.insert(id, object);
    }

    fn record_glyph(&mut self, font: ObjectId, glyph: u16, text: &str) {
        let entry = self.glyphs.entry(font).or_default().entry(glyph).or_default();
        if entry.is_empty() {
            entry.push_str(text);
        }
    }
}

// ============================================================================
// Fonts
// ============================================================================

/// Metrics of a resolved font
pub trait FontMetrics {
    /// Glyph index for a character, 0 (`.notdef`) when the font lacks it
    fn glyph_index(&self, c: char) -> u16;

    /// Advance width of a glyph in font design units
    fn advance_width(&self, glyph: u16) -> f64;

    /// Design units per em
    fn units_per_em(&self) -> f64;
}

/// A font the document already holds
#[derive(Clone, Copy)]
pub struct ResolvedFont<'a> {
    pub id: ObjectId,
    pub metrics: &'a dyn FontMetrics,
}

impl std::fmt::Debug for ResolvedFont<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFont").field("id", &self.id).finish_non_exhaustive()
    }
}

pub trait FontResolver {
    fn resolve_font(&self, uri: &str) -> Option<ResolvedFont<'_>>;

    /// Font to use when `resolve_font` fails, if any
    fn placeholder_font(&self) -> Option<ResolvedFont<'_>> {
        None
    }
}

/// Font metrics with a fixed character map and per-glyph widths
#[derive(Debug, Clone, Default)]
pub struct SimpleFont {
    pub units_per_em: f64,
    pub cmap: HashMap<char, u16>,
    pub widths: HashMap<u16, f64>,
    pub default_width: f64,
}

impl SimpleFont {
    /// Monospaced font mapping every char to its code point (truncated) and
    /// giving every glyph the same advance
    pub fn monospace(advance: f64, units_per_em: f64) -> Self {
        SimpleFont {
            units_per_em,
            cmap: HashMap::new(),
            widths: HashMap::new(),
            default_width: advance,
        }
    }

    pub fn with_glyph(mut self, c: char, glyph: u16, width: f64) -> Self {
        self.cmap.insert(c, glyph);
        self.widths.insert(glyph, width);
        self
    }
}

impl FontMetrics for SimpleFont {
    fn glyph_index(&self, c: char) -> u16 {
        match self.cmap.get(&c) {
            Some(g) => *g,
            None if self.cmap.is_empty() => u16::try_from(u32::from(c)).unwrap_or(0),
            None => 0,
        }
    }

    fn advance_width(&self, glyph: u16) -> f64 {
        self.widths.get(&glyph).copied().unwrap_or(self.default_width)
    }

    fn units_per_em(&self) -> f64 {
        self.units_per_em
    }
}

/// Font resolver backed by a map from URI to object id and metrics
#[derive(Debug, Default)]
pub struct MemoryFonts {
    fonts: HashMap<String, (ObjectId, SimpleFont)>,
    placeholder: Option<(ObjectId, SimpleFont)>,
}

impl MemoryFonts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, id: ObjectId, font: SimpleFont) {
        self.fonts.insert(uri.into(), (id, font));
    }

    pub fn with_placeholder(mut self, id: ObjectId, font: SimpleFont) -> Self {
        self.placeholder = Some((id, font));
        self
    }
}

impl FontResolver for MemoryFonts {
    fn resolve_font(&self, uri: &str) -> Option<ResolvedFont<'_>> {
        self.fonts.get(uri).map(|(id, font)| ResolvedFont {
            id: *id,
            metrics: font,
        })
    }

    fn placeholder_font(&self) -> Option<ResolvedFont<'_>> {
        self.placeholder.as_ref().map(|(id, font)| ResolvedFont {
            id: *id,
            metrics: font,
        })
    }
}

// ============================================================================
// Images
// ============================================================================

/// An image XObject the document already holds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedImage {
    pub id: ObjectId,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Horizontal and vertical resolution
    pub dpi: (f64, f64),
}

pub trait ImageResolver {
    fn resolve_image(&self, uri: &str) -> Option<ResolvedImage>;

    /// Image to use when `resolve_image` fails, if any
    fn placeholder_image(&self) -> Option<ResolvedImage> {
        None
    }
}

#[derive(Debug, Default)]
pub struct MemoryImages {
    images: HashMap<String, ResolvedImage>,
    placeholder: Option<ResolvedImage>,
}

impl MemoryImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, image: ResolvedImage) {
        self.images.insert(uri.into(), image);
    }

    pub fn with_placeholder(mut self, image: ResolvedImage) -> Self {
        self.placeholder = Some(image);
        self
    }
}

impl ImageResolver for MemoryImages {
    fn resolve_image(&self, uri: &str) -> Option<ResolvedImage> {
        self.images.get(uri).copied()
    }

    fn placeholder_image(&self) -> Option<ResolvedImage> {
        self.placeholder
    }
}

/// The three collaborators bundled for one rendering session
pub struct Host<'a> {
    pub doc: &'a mut dyn DocumentObjects,
    pub fonts: &'a dyn FontResolver,
    pub images: &'a dyn ImageResolver,
}

impl<'a> Host<'a> {
    pub fn new(
        doc: &'a mut dyn DocumentObjects,
        fonts: &'a dyn FontResolver,
        images: &'a dyn ImageResolver,
    ) -> Self {
        Host { doc, fonts, images }
    }
}
