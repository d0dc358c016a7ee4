//! Gradient stops to shading functions and shading dictionaries
//!
//! A pure translation: the same stops and flags always give the same
//! function description. Registration with the document happens in
//! `pattern`.

use glam::DVec2;

use crate::errors::RenderError;
use crate::object::{Dict, ObjectId, PdfObject};
use crate::scene::GradientStop;
use crate::types::Color;

/// What a shading function outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionMode {
    /// The stop colors
    Color,
    /// One gray channel carrying each stop's alpha, for soft masks
    Luminosity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceRgb,
    DeviceGray,
}

impl ColorSpace {
    pub fn name(self) -> &'static str {
        match self {
            ColorSpace::DeviceRgb => "DeviceRGB",
            ColorSpace::DeviceGray => "DeviceGray",
        }
    }
}

/// Function over the gradient parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ShadingFunction {
    /// FunctionType 2 with `N = 1`
    Exponential {
        domain: [f64; 2],
        c0: Vec<f64>,
        c1: Vec<f64>,
    },
    /// FunctionType 3
    Stitching {
        domain: [f64; 2],
        functions: Vec<ShadingFunction>,
        bounds: Vec<f64>,
        encode: Vec<f64>,
    },
}

impl ShadingFunction {
    pub fn is_exponential(&self) -> bool {
        matches!(self, ShadingFunction::Exponential { .. })
    }

    pub fn domain(&self) -> [f64; 2] {
        match self {
            ShadingFunction::Exponential { domain, .. }
            | ShadingFunction::Stitching { domain, .. } => *domain,
        }
    }

    /// Sub-functions of a stitching function, empty otherwise
    pub fn functions(&self) -> &[ShadingFunction] {
        match self {
            ShadingFunction::Stitching { functions, .. } => functions,
            ShadingFunction::Exponential { .. } => &[],
        }
    }

    pub fn bounds(&self) -> &[f64] {
        match self {
            ShadingFunction::Stitching { bounds, .. } => bounds,
            ShadingFunction::Exponential { .. } => &[],
        }
    }

    pub fn to_object(&self) -> PdfObject {
        match self {
            ShadingFunction::Exponential { domain, c0, c1 } => Dict::new()
                .with("FunctionType", 2i64)
                .with("Domain", PdfObject::reals(domain))
                .with("C0", PdfObject::reals(c0))
                .with("C1", PdfObject::reals(c1))
                .with("N", 1i64)
                .into(),
            ShadingFunction::Stitching {
                domain,
                functions,
                bounds,
                encode,
            } => Dict::new()
                .with("FunctionType", 3i64)
                .with("Domain", PdfObject::reals(domain))
                .with(
                    "Functions",
                    functions.iter().map(ShadingFunction::to_object).collect::<Vec<_>>(),
                )
                .with("Bounds", PdfObject::reals(bounds))
                .with("Encode", PdfObject::reals(encode))
                .into(),
        }
    }

    /// Evaluate at `t`, clamped to the domain
    pub fn eval(&self, t: f64) -> Vec<f64> {
        match self {
            ShadingFunction::Exponential { domain, c0, c1 } => {
                let span = domain[1] - domain[0];
                let x = if span.abs() < f64::EPSILON {
                    0.0
                } else {
                    ((t.clamp(domain[0], domain[1]) - domain[0]) / span).clamp(0.0, 1.0)
                };
                c0.iter().zip(c1).map(|(a, b)| a + (b - a) * x).collect()
            }
            ShadingFunction::Stitching {
                domain,
                functions,
                bounds,
                encode,
            } => {
                let t = t.clamp(domain[0], domain[1]);
                let k = bounds.iter().take_while(|b| t >= **b).count().min(functions.len() - 1);
                let lo = if k == 0 { domain[0] } else { bounds[k - 1] };
                let hi = if k == bounds.len() { domain[1] } else { bounds[k] };
                let (e0, e1) = (encode[2 * k], encode[2 * k + 1]);
                let x = if (hi - lo).abs() < f64::EPSILON {
                    e0
                } else {
                    e0 + (t - lo) / (hi - lo) * (e1 - e0)
                };
                // sub-functions always have domain [0 1]
                functions[k].eval(x)
            }
        }
    }
}

fn components(color: Color, mode: FunctionMode, space: ColorSpace) -> Vec<f64> {
    match (mode, space) {
        (FunctionMode::Luminosity, _) => vec![color.a.clamp(0.0, 1.0)],
        (FunctionMode::Color, ColorSpace::DeviceRgb) => vec![color.r, color.g, color.b],
        (FunctionMode::Color, ColorSpace::DeviceGray) => {
            vec![0.3 * color.r + 0.59 * color.g + 0.11 * color.b]
        }
    }
}

/// Color space a shading built with `mode` should declare
pub fn color_space_for(mode: FunctionMode) -> ColorSpace {
    match mode {
        FunctionMode::Color => ColorSpace::DeviceRgb,
        FunctionMode::Luminosity => ColorSpace::DeviceGray,
    }
}

/// Stops ordered by offset, offsets clamped into `[0, 1]`
pub fn sorted_stops(stops: &[GradientStop]) -> Result<Vec<GradientStop>, RenderError> {
    if stops.len() < 2 {
        return Err(RenderError::invalid(format!(
            "gradient needs at least 2 stops, got {}",
            stops.len()
        )));
    }
    let mut sorted: Vec<GradientStop> = stops
        .iter()
        .map(|s| {
            let offset = if s.offset.is_nan() { 0.0 } else { s.offset.clamp(0.0, 1.0) };
            GradientStop::new(offset, s.color)
        })
        .collect();
    sorted.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    Ok(sorted)
}

/// Build the interpolation function of a stop sequence.
///
/// Exactly two stops at offsets 0 and 1 give one exponential function;
/// anything else gives a stitching function of `n - 1` linear pieces. With
/// `reverse` the function runs from the last stop to the first.
pub fn build_shading_function(
    stops: &[GradientStop],
    mode: FunctionMode,
    space: ColorSpace,
    reverse: bool,
) -> Result<ShadingFunction, RenderError> {
    let stops = sorted_stops(stops)?;
    let n = stops.len();
    let first = stops[0].offset;
    let last = stops[n - 1].offset;

    if n == 2 && first == 0.0 && last == 1.0 {
        let (mut c0, mut c1) = (
            components(stops[0].color, mode, space),
            components(stops[1].color, mode, space),
        );
        if reverse {
            std::mem::swap(&mut c0, &mut c1);
        }
        return Ok(ShadingFunction::Exponential {
            domain: [0.0, 1.0],
            c0,
            c1,
        });
    }

    let domain = if first == last { [0.0, 1.0] } else { [first, last] };
    let pieces = stops.windows(2).map(|pair| ShadingFunction::Exponential {
        domain: [0.0, 1.0],
        c0: components(pair[0].color, mode, space),
        c1: components(pair[1].color, mode, space),
    });
    let interior = stops[1..n - 1].iter().map(|s| s.offset);

    let (functions, bounds, encode): (Vec<_>, Vec<_>, Vec<_>) = if reverse {
        // mirror the parameter: t' = first + last - t
        let mirror = first + last;
        (
            pieces.rev().collect(),
            interior.rev().map(|o| mirror - o).collect(),
            std::iter::repeat_n([1.0, 0.0], n - 1).flatten().collect(),
        )
    } else {
        (
            pieces.collect(),
            interior.collect(),
            std::iter::repeat_n([0.0, 1.0], n - 1).flatten().collect(),
        )
    };

    Ok(ShadingFunction::Stitching {
        domain,
        functions,
        bounds,
        encode,
    })
}

/// Axial shading dictionary between `start` and `end`, extended both ways
pub fn axial_shading(start: DVec2, end: DVec2, function: ObjectId, space: ColorSpace) -> Dict {
    Dict::new()
        .with("ShadingType", 2i64)
        .with("ColorSpace", PdfObject::name(space.name()))
        .with("Coords", PdfObject::reals(&[start.x, start.y, end.x, end.y]))
        .with("Function", function)
        .with("Extend", PdfObject::Array(vec![true.into(), true.into()]))
}

/// Radial shading dictionary from circle `(c0, r0)` to circle `(c1, r1)`
pub fn radial_shading(
    c0: DVec2,
    r0: f64,
    c1: DVec2,
    r1: f64,
    function: ObjectId,
    space: ColorSpace,
    extend: bool,
) -> Dict {
    Dict::new()
        .with("ShadingType", 3i64)
        .with("ColorSpace", PdfObject::name(space.name()))
        .with("Coords", PdfObject::reals(&[c0.x, c0.y, r0, c1.x, c1.y, r1]))
        .with("Function", function)
        .with("Extend", PdfObject::Array(vec![extend.into(), extend.into()]))
}
