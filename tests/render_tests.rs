//! End-to-end rendering scenarios
//!
//! Run with logging: RUST_LOG=debug cargo test --features tracing -- --nocapture

use glam::dvec2;
use pdfscribe::host::{Host, MemoryDocument, MemoryFonts, MemoryImages, ResolvedImage, SimpleFont};
use pdfscribe::object::{ObjectId, PdfObject};
use pdfscribe::render::{ContentWriter, RenderSession};
use pdfscribe::scene::{
    Brush, Canvas, Figure, Geometry, GlyphRun, Gradient, GradientStop, ImageBrush,
    LinearGradientBrush, Node, PathNode, PolySegment, RadialGradientBrush, Segment, SpreadMethod,
    Stroke, TileBrush, TileMode, Visual, VisualBrush,
};
use pdfscribe::types::{Color, Matrix, Rect};
use pdfscribe::{
    Page, RenderError, RenderOptions, RenderOutput, RenderTarget, UnsupportedFeaturePolicy, render,
    render_document,
};
use regex_lite::Regex;

const FONT_ID: ObjectId = ObjectId(1000);
const PAGE: RenderTarget = RenderTarget::Page {
    width: 816.0,
    height: 1056.0,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fonts() -> MemoryFonts {
    let mut fonts = MemoryFonts::new();
    fonts.insert("/fonts/mono.ttf", FONT_ID, SimpleFont::monospace(600.0, 1000.0));
    fonts
}

/// Render `nodes` onto a letter page, returning the output and the document
fn render_page(
    nodes: &[Node],
    options: RenderOptions,
) -> (Result<RenderOutput, RenderError>, MemoryDocument) {
    init_tracing();
    let mut doc = MemoryDocument::new();
    let fonts = fonts();
    let images = MemoryImages::new();
    let result = render(Host::new(&mut doc, &fonts, &images), nodes, PAGE, options);
    (result, doc)
}

fn page_text(nodes: &[Node]) -> (String, RenderOutput, MemoryDocument) {
    let (result, doc) = render_page(nodes, RenderOptions::default());
    let out = result.expect("page renders");
    let text = doc.stream_text(out.id).expect("content stream registered");
    (text, out, doc)
}

fn count(text: &str, operator: &str) -> usize {
    let re = Regex::new(&format!(r"(?m)(^|\s){}$", regex_lite::escape(operator))).unwrap();
    re.find_iter(text).count()
}

fn rect_path(r: Rect, fill: Brush) -> Node {
    Node::Path(PathNode::new(Geometry::rect(r)).with_fill(fill))
}

fn linear(stops: Vec<GradientStop>) -> Brush {
    Brush::Linear(LinearGradientBrush {
        gradient: Gradient::new(stops),
        start: dvec2(0.0, 0.0),
        end: dvec2(100.0, 0.0),
    })
}

fn dicts_of_type<'a>(
    doc: &'a MemoryDocument,
    kind: &str,
) -> Vec<(ObjectId, &'a pdfscribe::object::Dict)> {
    doc.objects()
        .filter_map(|(id, o)| o.as_dict().map(|d| (id, d)))
        .filter(|(_, d)| d.get("Type").and_then(PdfObject::as_name) == Some(kind))
        .collect()
}

#[test]
fn solid_rectangle_is_one_fill() {
    let (text, out, _) = page_text(&[rect_path(
        Rect::new(10.0, 10.0, 50.0, 50.0),
        Brush::solid(Color::rgb(1.0, 0.0, 0.0)),
    )]);
    assert_eq!(count(&text, "q"), 1);
    assert_eq!(count(&text, "re"), 1);
    assert_eq!(count(&text, "f*"), 1);
    assert_eq!(count(&text, "Q"), 1);
    assert!(out.warnings.is_empty());
    assert!(out.resources.is_empty());
    insta::assert_snapshot!(text.trim_end(), @r"
    q
    0.75 0 0 -0.75 0 792 cm
    1 0 0 rg
    10 10 50 50 re
    f*
    Q
    ");
}

#[test]
fn opaque_gradient_is_a_shading_pattern() {
    let brush = linear(vec![
        GradientStop::new(0.0, Color::rgb(1.0, 0.0, 0.0)),
        GradientStop::new(1.0, Color::rgb(0.0, 0.0, 1.0)),
    ]);
    let (text, out, doc) = page_text(&[rect_path(Rect::new(0.0, 0.0, 100.0, 100.0), brush)]);

    let patterns = dicts_of_type(&doc, "Pattern");
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].1.get("PatternType").and_then(PdfObject::as_f64), Some(2.0));
    // the pattern matrix carries the page transform
    assert_eq!(
        patterns[0].1.get("Matrix").unwrap().to_string(),
        "[0.75 0 0 -0.75 0 792]"
    );
    assert!(dicts_of_type(&doc, "ExtGState").is_empty());
    assert!(text.contains("/Pattern cs /P0 scn\n0 0 100 100 re\nf*\n"), "{text}");
    assert_eq!(
        out.resources.to_string(),
        format!("<< /Pattern << /P0 {} >> >>", patterns[0].0)
    );
}

#[test]
fn transparent_gradient_uses_a_soft_mask() {
    let brush = linear(vec![
        GradientStop::new(0.0, Color::rgb(1.0, 0.0, 0.0)),
        GradientStop::new(1.0, Color::argb(0.5, 0.0, 0.0, 1.0)),
    ]);
    let (text, out, doc) = page_text(&[rect_path(Rect::new(0.0, 0.0, 100.0, 100.0), brush)]);

    let states = dicts_of_type(&doc, "ExtGState");
    assert_eq!(states.len(), 1);
    let smask = states[0].1.get("SMask").and_then(PdfObject::as_dict).expect("soft mask entry");
    assert_eq!(smask.get("S").and_then(PdfObject::as_name), Some("Luminosity"));
    let mask_id = smask.get("G").and_then(PdfObject::as_ref_id).unwrap();
    let mask = doc.get(mask_id).and_then(PdfObject::as_dict).unwrap();
    assert!(mask.get("Group").is_some());

    // the luminosity function carries the stop alphas only
    let mask_text = doc.stream_text(mask_id).unwrap();
    assert!(mask_text.contains("/Sh0 sh"), "{mask_text}");
    let gray = doc
        .objects()
        .filter_map(|(_, o)| o.as_dict())
        .find(|d| d.get("ColorSpace").and_then(PdfObject::as_name) == Some("DeviceGray"))
        .expect("gray shading");
    let function = doc.get(gray.get("Function").and_then(PdfObject::as_ref_id).unwrap()).unwrap();
    assert_eq!(function.to_string(), "<< /FunctionType 2 /Domain [0 1] /C0 [1] /C1 [0.5] /N 1 >>");

    assert!(text.contains("q\n/Gs0 gs\n/Pattern cs /P0 scn\n0 0 100 100 re\nf*\nQ\n"), "{text}");
    assert_eq!(count(&text, "q"), count(&text, "Q"));
    assert!(out.resources.get("ExtGState").is_some());
}

#[test]
fn plain_glyph_run_is_one_show() {
    let run = GlyphRun::new(dvec2(96.0, 96.0), "/fonts/mono.ttf", 16.0, "Hello");
    let (text, out, doc) = page_text(&[Node::Glyphs(run)]);

    let show = Regex::new(r"<(?:[0-9A-F]{4}){5}> Tj").unwrap();
    assert_eq!(show.find_iter(&text).count(), 1, "{text}");
    assert_eq!(count(&text, "Tj"), 1);
    assert_eq!(text.matches(" Tm\n").count(), 1);
    assert_eq!(text.matches(" Td\n").count(), 0);
    assert_eq!(count(&text, "BT"), 1);
    assert_eq!(count(&text, "ET"), 1);

    assert_eq!(
        out.resources.to_string(),
        format!("<< /Font << /F0 {FONT_ID} >> >>")
    );
    let used: Vec<u16> = doc.used_glyphs(FONT_ID).into_iter().collect();
    assert_eq!(used, vec![0x48, 0x65, 0x6C, 0x6F]);
    assert_eq!(doc.glyph_text(FONT_ID, 0x48), Some("H"));
}

#[test]
fn too_few_stops_are_invalid() {
    for stops in [vec![], vec![GradientStop::new(0.5, Color::BLACK)]] {
        let (result, _) = render_page(
            &[rect_path(Rect::new(0.0, 0.0, 10.0, 10.0), linear(stops))],
            RenderOptions::default(),
        );
        assert!(
            matches!(result, Err(RenderError::InvalidParameter { .. })),
            "{result:?}"
        );
    }
}

#[test]
fn saves_and_restores_balance_in_a_busy_scene() {
    let reflect = {
        let mut gradient = Gradient::new(vec![
            GradientStop::new(0.0, Color::WHITE),
            GradientStop::new(1.0, Color::argb(0.5, 0.0, 0.5, 0.0)),
        ]);
        gradient.spread = SpreadMethod::Reflect;
        Brush::Radial(RadialGradientBrush {
            gradient,
            center: dvec2(50.0, 50.0),
            origin: dvec2(40.0, 40.0),
            radius_x: 20.0,
            radius_y: 10.0,
        })
    };
    let mut run = GlyphRun::new(dvec2(10.0, 200.0), "/fonts/mono.ttf", 12.0, "abc");
    run.simulations.bold = true;
    run.opacity = 0.5;

    let mut canvas = Canvas::new(vec![
        rect_path(Rect::new(0.0, 0.0, 100.0, 100.0), reflect),
        Node::Path(
            PathNode::new(Geometry::rect(Rect::new(5.0, 5.0, 20.0, 20.0)))
                .with_stroke(Stroke::new(
                    linear(vec![
                        GradientStop::new(0.0, Color::BLACK),
                        GradientStop::new(0.5, Color::WHITE),
                        GradientStop::new(1.0, Color::BLACK),
                    ]),
                    2.0,
                ))
                .with_opacity(0.25),
        ),
        Node::Glyphs(run),
        Node::Visual(Visual {
            children: vec![rect_path(Rect::new(0.0, 0.0, 5.0, 5.0), Brush::solid(Color::BLACK))],
            transform: Some(Matrix::scale(2.0, 2.0)),
            opacity: 0.5,
        }),
        Node::Comment("end of canvas".into()),
    ]);
    canvas.render_transform = Some(Matrix::translate(10.0, 10.0));
    canvas.clip = Some(Geometry::rect(Rect::new(0.0, 0.0, 300.0, 300.0)));
    canvas.opacity = 0.75;

    let options = RenderOptions::default().with_annotate_debug_comments(true).with_indent(true);
    let (result, doc) = render_page(&[Node::Canvas(canvas)], options);
    let out = result.unwrap();

    for (id, object) in doc.objects() {
        if let PdfObject::Stream { .. } = object {
            let text = doc.stream_text(id).unwrap();
            assert_eq!(count(&text, "q"), count(&text, "Q"), "stream {id}:\n{text}");
            assert_eq!(count(&text, "BT"), count(&text, "ET"), "stream {id}:\n{text}");
        }
    }
    let text = doc.stream_text(out.id).unwrap();
    assert!(text.contains("% end of canvas"), "{text}");
    assert!(text.contains("W* n"), "{text}");
    assert!(text.contains("/Fm0 Do"), "{text}");
    assert!(text.contains("2 Tr"), "{text}");
    // the radial series is drawn ring by ring
    assert!(count(&text, "sh") >= 2, "{text}");
}

#[test]
fn graphics_states_are_interned() {
    let half = |x| {
        Node::Path(
            PathNode::new(Geometry::rect(Rect::new(x, 0.0, 10.0, 10.0)))
                .with_fill(Brush::solid(Color::BLACK))
                .with_opacity(0.5),
        )
    };
    let (text, out, doc) = page_text(&[half(0.0), half(20.0), half(40.0)]);
    assert_eq!(dicts_of_type(&doc, "ExtGState").len(), 1);
    assert_eq!(text.matches("/Gs0 gs").count(), 3);
    let states = out.resources.get("ExtGState").and_then(PdfObject::as_dict).unwrap();
    assert_eq!(states.len(), 1);
}

#[test]
fn deep_nesting_is_refused() {
    let mut node = rect_path(Rect::new(0.0, 0.0, 1.0, 1.0), Brush::solid(Color::BLACK));
    for _ in 0..10 {
        node = Node::Canvas(Canvas::new(vec![node]));
    }
    let shallow = RenderOptions::default().with_max_nesting_depth(4);
    let (result, _) = render_page(&[node.clone()], shallow);
    assert_eq!(result.unwrap_err(), RenderError::NestingTooDeep { limit: 4 });

    let (result, _) = render_page(&[node], RenderOptions::default());
    assert!(result.is_ok());
}

#[test]
fn unsupported_features_follow_the_policy() {
    let mut gradient = Gradient::new(vec![
        GradientStop::new(0.0, Color::BLACK),
        GradientStop::new(1.0, Color::WHITE),
    ]);
    gradient.spread = SpreadMethod::Repeat;
    let brush = Brush::Linear(LinearGradientBrush {
        gradient,
        start: dvec2(0.0, 0.0),
        end: dvec2(10.0, 0.0),
    });
    let nodes = [rect_path(Rect::new(0.0, 0.0, 50.0, 50.0), brush)];

    let (result, _) = render_page(&nodes, RenderOptions::default());
    let out = result.unwrap();
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].stream, Some(out.id));

    let fail =
        RenderOptions::default().with_unsupported_feature_policy(UnsupportedFeaturePolicy::Fail);
    let (result, _) = render_page(&nodes, fail);
    assert!(matches!(result, Err(RenderError::UnsupportedFeature { .. })));
}

#[test]
fn document_keeps_going_after_a_missing_image() {
    init_tracing();
    let mut doc = MemoryDocument::new();
    let fonts = fonts();
    let mut images = MemoryImages::new();
    images.insert(
        "/images/ok.png",
        ResolvedImage {
            id: ObjectId(2000),
            width: 96,
            height: 96,
            dpi: (96.0, 96.0),
        },
    );
    let image = |uri: &str| {
        let area = Rect::new(0.0, 0.0, 96.0, 96.0);
        rect_path(
            area,
            Brush::Image(ImageBrush {
                image_uri: uri.into(),
                tile: TileBrush::new(area, area),
            }),
        )
    };
    let pages = [
        Page::new(816.0, 1056.0, vec![image("/images/ok.png")]),
        Page::new(816.0, 1056.0, vec![image("/images/missing.png")]),
        Page::new(816.0, 1056.0, vec![Node::Glyphs(GlyphRun::new(
            dvec2(0.0, 20.0),
            "/fonts/mono.ttf",
            10.0,
            "x",
        ))]),
    ];
    let output =
        render_document(Host::new(&mut doc, &fonts, &images), &pages, RenderOptions::default());

    assert_eq!(output.pages.len(), 3);
    let failures: Vec<_> = output.failures().map(|(i, _)| i).collect();
    assert_eq!(failures, vec![1]);

    // the image on its own viewport is drawn directly
    let first = output.pages[0].as_ref().unwrap();
    let text = doc.stream_text(first.id).unwrap();
    assert!(text.contains("0 0 96 96 re\nW* n\nq\n96 0 0 -96 0 96 cm\n/Im0 Do\nQ\n"), "{text}");
}

#[test]
fn placeholder_image_stands_in() {
    init_tracing();
    let mut doc = MemoryDocument::new();
    let fonts = fonts();
    let images = MemoryImages::new().with_placeholder(ResolvedImage {
        id: ObjectId(3000),
        width: 1,
        height: 1,
        dpi: (96.0, 96.0),
    });
    let mut tile = TileBrush::new(Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(0.0, 0.0, 8.0, 8.0));
    tile.tile_mode = TileMode::Tile;
    let node = rect_path(
        Rect::new(0.0, 0.0, 64.0, 64.0),
        Brush::Image(ImageBrush {
            image_uri: "/images/gone.png".into(),
            tile,
        }),
    );
    let host = Host::new(&mut doc, &fonts, &images);
    let out = render(host, &[node], PAGE, RenderOptions::default()).unwrap();
    let patterns = dicts_of_type(&doc, "Pattern");
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].1.get("PatternType").and_then(PdfObject::as_f64), Some(1.0));
    assert!(out.warnings.is_empty());
}

#[test]
fn form_target_has_no_page_transform() {
    let mut doc = MemoryDocument::new();
    let fonts = fonts();
    let images = MemoryImages::new();
    let target = RenderTarget::Form {
        bbox: Rect::new(0.0, 0.0, 20.0, 20.0),
        matrix: Some(Matrix::translate(1.0, 2.0)),
    };
    let line = Node::Path(
        PathNode::new(Geometry::new(vec![
            Figure::new(dvec2(0.0, 0.0), false)
                .with_segment(Segment::Poly(PolySegment::lines(vec![dvec2(20.0, 20.0)]))),
        ]))
        .with_stroke(Stroke::new(Brush::solid(Color::BLACK), 1.0)),
    );
    let host = Host::new(&mut doc, &fonts, &images);
    let out = render(host, &[line], target, RenderOptions::default()).unwrap();
    let text = doc.stream_text(out.id).unwrap();
    insta::assert_snapshot!(text.trim_end(), @r"
    q
    0 0 0 RG
    1 w
    0 J
    0 j
    10 M
    [] 0 d
    0 0 m
    20 20 l
    S
    Q
    ");
    let dict = doc.get(out.id).and_then(PdfObject::as_dict).unwrap();
    assert_eq!(dict.get("Matrix").unwrap().to_string(), "[1 0 0 1 1 2]");
}

#[test]
fn writer_reports_unclosed_saves() {
    let mut doc = MemoryDocument::new();
    let fonts = fonts();
    let images = MemoryImages::new();
    let mut session =
        RenderSession::new(Host::new(&mut doc, &fonts, &images), RenderOptions::default());
    let mut writer = ContentWriter::new(&mut session, PAGE);
    writer.push_state();
    writer.push_state();
    let err = writer.finish(&mut session).unwrap_err();
    assert_eq!(err, RenderError::StructuralImbalance { depth: 2 });
    assert!(err.is_fatal());
}

/// Alpha of the ExtGState behind `/name gs` in a stream's resources
fn gs_alpha(doc: &MemoryDocument, resources: &pdfscribe::object::Dict, name: &str) -> f64 {
    let id = resources
        .get("ExtGState")
        .and_then(PdfObject::as_dict)
        .and_then(|d| d.get(name))
        .and_then(PdfObject::as_ref_id)
        .unwrap();
    doc.get(id)
        .and_then(PdfObject::as_dict)
        .and_then(|d| d.get("ca"))
        .and_then(PdfObject::as_f64)
        .unwrap()
}

#[test]
fn visual_opacity_composes_with_its_children() {
    let child = Node::Path(
        PathNode::new(Geometry::rect(Rect::new(0.0, 0.0, 10.0, 10.0)))
            .with_fill(Brush::solid(Color::BLACK))
            .with_opacity(0.8),
    );
    let visual = Node::Visual(Visual {
        children: vec![child],
        transform: None,
        opacity: 0.5,
    });
    let (text, out, doc) = page_text(&[visual]);
    assert!(text.contains("/Gs0 gs\n/Fm0 Do\n"), "{text}");
    assert_eq!(gs_alpha(&doc, &out.resources, "Gs0"), 0.5);

    let form_id = out
        .resources
        .get("XObject")
        .and_then(PdfObject::as_dict)
        .and_then(|d| d.get("Fm0"))
        .and_then(PdfObject::as_ref_id)
        .unwrap();
    let form = doc.get(form_id).and_then(PdfObject::as_dict).unwrap();
    // an isolated group starts from full alpha, so the inner 0.8 is
    // composited at the outer 0.5
    let group = form.get("Group").and_then(PdfObject::as_dict).expect("transparency group");
    assert_eq!(group.get("S").and_then(PdfObject::as_name), Some("Transparency"));
    let inner = form.get("Resources").and_then(PdfObject::as_dict).unwrap();
    assert_eq!(gs_alpha(&doc, inner, "Gs0"), 0.8);
}

#[test]
fn visual_brush_fill_is_a_tiling_pattern() {
    let square = Node::Path(
        PathNode::new(Geometry::rect(Rect::new(0.0, 0.0, 4.0, 4.0)))
            .with_fill(Brush::solid(Color::rgb(0.0, 0.0, 1.0))),
    );
    let mut tile = TileBrush::new(Rect::new(0.0, 0.0, 4.0, 4.0), Rect::new(10.0, 10.0, 8.0, 8.0));
    tile.tile_mode = TileMode::Tile;
    let brush = Brush::Visual(VisualBrush {
        visual: vec![square],
        tile,
    });
    let nodes = [rect_path(Rect::new(0.0, 0.0, 100.0, 100.0), brush)];
    let (text, out, doc) = page_text(&nodes);
    assert!(out.warnings.is_empty());
    assert!(text.contains("/Pattern cs /P0 scn\n0 0 100 100 re\nf*\n"), "{text}");

    let patterns = dicts_of_type(&doc, "Pattern");
    assert_eq!(patterns.len(), 1);
    let (pattern_id, pattern) = patterns[0];
    assert_eq!(pattern.get("PatternType").and_then(PdfObject::as_f64), Some(1.0));
    assert_eq!(pattern.get("BBox").unwrap().to_string(), "[10 10 18 18]");
    assert_eq!(doc.stream_text(pattern_id).unwrap(), "/Fm0 Do\n");
    let form_id = pattern
        .get("Resources")
        .and_then(PdfObject::as_dict)
        .and_then(|r| r.get("XObject"))
        .and_then(PdfObject::as_dict)
        .and_then(|x| x.get("Fm0"))
        .and_then(PdfObject::as_ref_id)
        .unwrap();
    let form_text = doc.stream_text(form_id).unwrap();
    // viewbox 4x4 onto the 8x8 viewport at (10, 10)
    assert!(form_text.contains("2 0 0 2 10 10 cm\n"), "{form_text}");
    assert!(form_text.contains("0 0 1 rg\n0 0 4 4 re\nf*\n"), "{form_text}");

    // the tile stream is one level deeper than the page
    let (result, _) = render_page(&nodes, RenderOptions::default().with_max_nesting_depth(0));
    assert_eq!(result.unwrap_err(), RenderError::NestingTooDeep { limit: 0 });
}
