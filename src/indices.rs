//! Parse glyph index mapping strings into [`GlyphMapping`] entries
//!
//! The syntax is a `;`-separated list of `(units:glyphs)index,advance,u,v`
//! entries where every part is optional. A cluster header covers the entry it
//! appears on plus the following `glyphs - 1` entries.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::errors::RenderError;
use crate::scene::GlyphMapping;

#[derive(Parser)]
#[grammar = "indices.pest"]
struct IndicesParser;

/// Parse a glyph index mapping string
pub fn parse_indices(source: &str) -> Result<Vec<GlyphMapping>, RenderError> {
    let pairs = IndicesParser::parse(Rule::indices, source)
        .map_err(|e| RenderError::invalid(format!("glyph indices: {e}")))?;

    let mut mappings = Vec::new();
    // glyphs still owed to the current multi-glyph cluster
    let mut pending_glyphs = 0usize;

    for pair in pairs.flat_map(|p| p.into_inner()) {
        if pair.as_rule() != Rule::mapping {
            continue;
        }
        let mut entry = parse_mapping(pair)?;
        match entry.cluster {
            Some((units, glyphs)) => {
                if pending_glyphs > 0 {
                    return Err(RenderError::invalid(format!(
                        "glyph indices: cluster starts while {pending_glyphs} glyphs \
                        are outstanding"
                    )));
                }
                if units == 0 || glyphs == 0 {
                    return Err(RenderError::invalid("glyph indices: empty cluster"));
                }
                entry.mapping.code_units = units;
                entry.mapping.glyph_count = glyphs;
                pending_glyphs = glyphs - 1;
            }
            None if pending_glyphs > 0 => {
                entry.mapping.code_units = 0;
                entry.mapping.glyph_count = 0;
                pending_glyphs -= 1;
            }
            None => {
                entry.mapping.code_units = 1;
                entry.mapping.glyph_count = 1;
            }
        }
        mappings.push(entry.mapping);
    }

    if pending_glyphs > 0 {
        return Err(RenderError::invalid(format!(
            "glyph indices: last cluster is missing {pending_glyphs} glyphs"
        )));
    }
    Ok(mappings)
}

struct ParsedEntry {
    cluster: Option<(usize, usize)>,
    mapping: GlyphMapping,
}

fn parse_mapping(pair: Pair<Rule>) -> Result<ParsedEntry, RenderError> {
    let mut entry = ParsedEntry {
        cluster: None,
        mapping: GlyphMapping::default(),
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::cluster => entry.cluster = Some(parse_cluster(inner)?),
            Rule::glyph_index => {
                let text = inner.as_str();
                let index = text.parse::<u16>().map_err(|_| {
                    RenderError::invalid(format!("glyph index out of range: {text}"))
                })?;
                entry.mapping.index = Some(index);
            }
            Rule::advance => entry.mapping.advance = Some(parse_number(inner)?),
            Rule::u_offset => entry.mapping.u_offset = Some(parse_number(inner)?),
            Rule::v_offset => entry.mapping.v_offset = Some(parse_number(inner)?),
            _ => {}
        }
    }
    Ok(entry)
}

fn parse_cluster(pair: Pair<Rule>) -> Result<(usize, usize), RenderError> {
    let mut units = 1;
    let mut glyphs = 1;
    for inner in pair.into_inner() {
        let text = inner.as_str();
        let value = text.parse::<usize>().map_err(|_| {
            RenderError::invalid(format!("cluster count out of range: {text}"))
        })?;
        match inner.as_rule() {
            Rule::cluster_units => units = value,
            Rule::cluster_glyphs => glyphs = value,
            _ => {}
        }
    }
    Ok((units, glyphs))
}

fn parse_number(pair: Pair<Rule>) -> Result<f64, RenderError> {
    let s = pair.as_str().trim();
    let value = s
        .parse::<f64>()
        .map_err(|_| RenderError::invalid(format!("invalid number in glyph indices: {s}")))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RenderError::invalid(format!("non-finite number in glyph indices: {s}")))
    }
}
