//! Geometry emission: figures and segments to path construction operators
//!
//! Quadratic curves are degree-elevated, arcs are split into cubic pieces of
//! at most a quarter turn, and the flattening fallback turns every cubic into
//! line segments. A closed three-point polyline that forms an axis-aligned
//! rectangle becomes a single `re`.

use std::f64::consts::{FRAC_PI_2, TAU};

use glam::{DVec2, dvec2};

use crate::scene::{ArcSegment, Figure, Geometry, Segment, SegmentPoints, SweepDirection};
use crate::types::{Matrix, Rect};

use super::path_builder::{PathBuilder, PathOp};
use super::CurveStrategy;

/// Subdivision depth limit of the flattening fallback
const MAX_FLATTEN_DEPTH: u32 = 16;

// ============================================================================
// Curve math
// ============================================================================

/// Cubic control points of the quadratic `p0`, `cq`, `p2`
pub fn quad_to_cubic(p0: DVec2, cq: DVec2, p2: DVec2) -> (DVec2, DVec2) {
    let c1 = p0 + (cq - p0) * (2.0 / 3.0);
    let c2 = p2 + (cq - p2) * (2.0 / 3.0);
    (c1, c2)
}

/// Point on a cubic Bézier at `t`
pub fn cubic_point(p0: DVec2, p1: DVec2, p2: DVec2, p3: DVec2, t: f64) -> DVec2 {
    let mt = 1.0 - t;
    p0 * (mt * mt * mt) + p1 * (3.0 * mt * mt * t) + p2 * (3.0 * mt * t * t) + p3 * (t * t * t)
}

/// Point on a quadratic Bézier at `t`
pub fn quad_point(p0: DVec2, p1: DVec2, p2: DVec2, t: f64) -> DVec2 {
    let mt = 1.0 - t;
    p0 * (mt * mt) + p1 * (2.0 * mt * t) + p2 * (t * t)
}

/// Signed angle from `u` to `v`
fn vector_angle(u: DVec2, v: DVec2) -> f64 {
    let angle = (u.dot(v) / (u.length() * v.length())).clamp(-1.0, 1.0).acos();
    if u.perp_dot(v) < 0.0 { -angle } else { angle }
}

/// Split the arc from `from` into cubic pieces of at most 90 degrees.
///
/// Each piece is `[control1, control2, end]`. An empty result means the arc
/// degenerates to a straight line to its end point (zero radius or
/// coincident end points).
pub fn arc_to_bezier(from: DVec2, arc: &ArcSegment) -> Vec<[DVec2; 3]> {
    let to = arc.point;
    let mut rx = arc.size.x.abs();
    let mut ry = arc.size.y.abs();
    if from == to || rx == 0.0 || ry == 0.0 || !rx.is_finite() || !ry.is_finite() {
        return Vec::new();
    }

    let (sin_phi, cos_phi) = arc.rotation_angle.to_radians().sin_cos();
    let half = (from - to) / 2.0;
    let x1 = cos_phi * half.x + sin_phi * half.y;
    let y1 = -sin_phi * half.x + cos_phi * half.y;

    // scale radii up when the end points cannot be reached
    let lambda = (x1 * x1) / (rx * rx) + (y1 * y1) / (ry * ry);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let clockwise = arc.sweep == SweepDirection::Clockwise;
    let sign = if arc.is_large_arc != clockwise { 1.0 } else { -1.0 };
    let num = rx * rx * ry * ry - rx * rx * y1 * y1 - ry * ry * x1 * x1;
    let den = rx * rx * y1 * y1 + ry * ry * x1 * x1;
    let coef = sign * (num / den).max(0.0).sqrt();
    let cx1 = coef * rx * y1 / ry;
    let cy1 = -coef * ry * x1 / rx;

    let mid = (from + to) / 2.0;
    let center = dvec2(
        cos_phi * cx1 - sin_phi * cy1 + mid.x,
        sin_phi * cx1 + cos_phi * cy1 + mid.y,
    );

    let start_vec = dvec2((x1 - cx1) / rx, (y1 - cy1) / ry);
    let end_vec = dvec2((-x1 - cx1) / rx, (-y1 - cy1) / ry);
    let theta1 = vector_angle(DVec2::X, start_vec);
    let mut delta = vector_angle(start_vec, end_vec) % TAU;
    if !clockwise && delta > 0.0 {
        delta -= TAU;
    } else if clockwise && delta < 0.0 {
        delta += TAU;
    }

    let pieces = (delta.abs() / FRAC_PI_2 - 1e-9).ceil().max(1.0) as usize;
    let step = delta / pieces as f64;
    let k = 4.0 / 3.0 * (step / 4.0).tan();

    let map = |unit: DVec2| {
        let p = dvec2(unit.x * rx, unit.y * ry);
        center + dvec2(cos_phi * p.x - sin_phi * p.y, sin_phi * p.x + cos_phi * p.y)
    };

    let mut out = Vec::with_capacity(pieces);
    let mut theta = theta1;
    for i in 0..pieces {
        let next = theta + step;
        let (s0, c0) = theta.sin_cos();
        let (s1, c1) = next.sin_cos();
        let ctrl1 = map(dvec2(c0 - k * s0, s0 + k * c0));
        let ctrl2 = map(dvec2(c1 + k * s1, s1 - k * c1));
        let end = if i + 1 == pieces { to } else { map(dvec2(c1, s1)) };
        out.push([ctrl1, ctrl2, end]);
        theta = next;
    }
    out
}

/// Line segments approximating a cubic within `tolerance`, `p0` excluded
pub fn flatten_cubic(p0: DVec2, p1: DVec2, p2: DVec2, p3: DVec2, tolerance: f64) -> Vec<DVec2> {
    let mut out = Vec::new();
    flatten_into(&mut out, [p0, p1, p2, p3], tolerance.max(1e-6), 0);
    out
}

fn flatten_into(out: &mut Vec<DVec2>, c: [DVec2; 4], tolerance: f64, depth: u32) {
    let [p0, p1, p2, p3] = c;
    let flat = distance_to_line(p1, p0, p3).max(distance_to_line(p2, p0, p3)) <= tolerance;
    if flat || depth >= MAX_FLATTEN_DEPTH {
        out.push(p3);
        return;
    }
    // de Casteljau split at t = 0.5
    let p01 = (p0 + p1) / 2.0;
    let p12 = (p1 + p2) / 2.0;
    let p23 = (p2 + p3) / 2.0;
    let p012 = (p01 + p12) / 2.0;
    let p123 = (p12 + p23) / 2.0;
    let mid = (p012 + p123) / 2.0;
    flatten_into(out, [p0, p01, p012, mid], tolerance, depth + 1);
    flatten_into(out, [mid, p123, p23, p3], tolerance, depth + 1);
}

fn distance_to_line(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len = ab.length();
    if len < 1e-12 {
        (p - a).length()
    } else {
        ab.perp_dot(p - a).abs() / len
    }
}

// ============================================================================
// Rectangle detection
// ============================================================================

/// `re` operands for a closed `p0 -> p1 -> p2 -> p3` outline that is an
/// axis-aligned rectangle, preserving its winding
pub fn detect_rect(p0: DVec2, p1: DVec2, p2: DVec2, p3: DVec2) -> Option<(DVec2, DVec2)> {
    if p0.y == p1.y && p1.x == p2.x && p2.y == p3.y && p3.x == p0.x {
        Some((p0, p2 - p0))
    } else if p0.x == p1.x && p1.y == p2.y && p2.x == p3.x && p3.y == p0.y {
        Some((dvec2(p2.x, p0.y), dvec2(p0.x - p2.x, p2.y - p0.y)))
    } else {
        None
    }
}

// ============================================================================
// Figure emission
// ============================================================================

/// Path operators for a whole geometry
pub fn build_path(geometry: &Geometry, strategy: CurveStrategy, flatness: f64) -> Vec<PathOp> {
    let mut builder = PathBuilder::new();
    for figure in &geometry.figures {
        add_figure(&mut builder, figure, strategy, flatness);
    }
    builder.build()
}

fn add_figure(builder: &mut PathBuilder, figure: &Figure, strategy: CurveStrategy, flatness: f64) {
    let m = figure.transform.unwrap_or(Matrix::IDENTITY);
    let map = |p: DVec2| m.transform_point(p);
    let start = map(figure.start);

    if let Some((origin, size)) = figure_rect(figure, &map) {
        builder.rect(origin, size);
        return;
    }

    builder.move_to(start);
    let mut pen = figure.start;
    let cubic = |builder: &mut PathBuilder, c1: DVec2, c2: DVec2, p: DVec2| match strategy {
        CurveStrategy::Bezier => builder.curve_to(c1, c2, p),
        CurveStrategy::Flatten => {
            let from = builder.current().unwrap_or(c1);
            for q in flatten_cubic(from, c1, c2, p, flatness) {
                builder.line_to(q);
            }
        }
    };

    for segment in &figure.segments {
        match segment {
            Segment::Poly(poly) => {
                for p in &poly.points {
                    builder.line_to(map(*p));
                    pen = *p;
                }
            }
            Segment::Cubic(bez) => {
                for chunk in bez.points.chunks_exact(3) {
                    cubic(builder, map(chunk[0]), map(chunk[1]), map(chunk[2]));
                    pen = chunk[2];
                }
            }
            Segment::Quadratic(quad) => {
                for chunk in quad.points.chunks_exact(2) {
                    let (c1, c2) = quad_to_cubic(pen, chunk[0], chunk[1]);
                    cubic(builder, map(c1), map(c2), map(chunk[1]));
                    pen = chunk[1];
                }
            }
            Segment::Arc(arc) => {
                let pieces = arc_to_bezier(pen, arc);
                if pieces.is_empty() {
                    builder.line_to(map(arc.point));
                } else {
                    for [c1, c2, p] in pieces {
                        cubic(builder, map(c1), map(c2), map(p));
                    }
                }
                pen = arc.point;
            }
        }
    }

    if figure.closed {
        builder.close();
    }
}

/// Rectangle operands of a closed figure made of one three-point polyline
fn figure_rect(figure: &Figure, map: &impl Fn(DVec2) -> DVec2) -> Option<(DVec2, DVec2)> {
    if !figure.closed {
        return None;
    }
    match figure.segments.as_slice() {
        [Segment::Poly(poly)] => match poly.points.as_slice() {
            [p1, p2, p3] => detect_rect(map(figure.start), map(*p1), map(*p2), map(*p3)),
            _ => None,
        },
        _ => None,
    }
}

// ============================================================================
// Stroke caps
// ============================================================================

/// Filled triangles standing in for triangle line caps at the open ends of
/// every figure
pub fn triangle_caps(
    geometry: &Geometry,
    thickness: f64,
    start: bool,
    end: bool,
) -> Vec<[DVec2; 3]> {
    let half = thickness / 2.0;
    let mut caps = Vec::new();
    for figure in geometry.figures.iter().filter(|f| !f.closed) {
        let mut points = outline_points(figure);
        points.dedup();
        if points.len() < 2 {
            continue;
        }

        if start {
            let p = points[0];
            let dir = (points[1] - p).normalize_or_zero();
            caps.push(cap_triangle(p, -dir, half));
        }
        if end {
            let n = points.len();
            let p = points[n - 1];
            let dir = (p - points[n - 2]).normalize_or_zero();
            caps.push(cap_triangle(p, dir, half));
        }
    }
    caps
}

/// Start, control and end points of a figure in drawing order, arcs
/// expanded to their cubic pieces, in the figure's outer space
fn outline_points(figure: &Figure) -> Vec<DVec2> {
    let m = figure.transform.unwrap_or(Matrix::IDENTITY);
    let mut points = vec![figure.start];
    let mut pen = figure.start;
    for segment in &figure.segments {
        match segment {
            Segment::Arc(arc) => {
                let pieces = arc_to_bezier(pen, arc);
                if pieces.is_empty() {
                    points.push(arc.point);
                } else {
                    points.extend(pieces.into_iter().flatten());
                }
            }
            other => points.extend(other.points()),
        }
        pen = segment.end_point().unwrap_or(pen);
    }
    points.into_iter().map(|p| m.transform_point(p)).collect()
}

/// Bounds of every start, end and control point, arcs included through
/// their cubic pieces
pub fn control_bounds(geometry: &Geometry) -> Rect {
    let mut bounds = Rect::EMPTY;
    for p in geometry.figures.iter().flat_map(outline_points) {
        bounds.expand_point(p);
    }
    bounds
}

/// Triangle with its base across the stroke at `p` and its apex `half` away along `outward`
fn cap_triangle(p: DVec2, outward: DVec2, half: f64) -> [DVec2; 3] {
    let normal = outward.perp() * half;
    [p + normal, p + outward * half, p - normal]
}
