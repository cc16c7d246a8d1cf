//! Parser and emitter for the path-data mini-language.
//!
//! The grammar (`src/path.pest`) accepts `M x y` followed by any mix of
//! `L`, `C`, `Q`, and `A` commands with absolute coordinates, separated
//! by whitespace or commas. Arc commands are normalized to cubic chains
//! on ingest, so emission never produces an `A`; for line, cubic, and
//! quadratic segments emission is the exact inverse of parsing.

use glam::{DVec2, dvec2};
use miette::{NamedSource, SourceSpan};
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::errors::ParseError;
use crate::path::{Path, PathBuilder};
use crate::segment::Segment;

#[derive(Parser)]
#[grammar = "path.pest"]
struct PathDataParser;

const SOURCE_NAME: &str = "<path-data>";

/// Parse path-data text into a [`Path`].
pub fn parse_path_data(input: &str) -> Result<Path, ParseError> {
    let mut pairs = PathDataParser::parse(Rule::path_data, input)
        .map_err(|e| syntax_error(input, &e))?;
    let root = pairs.next().expect("grammar yields exactly one path_data");

    let mut builder: Option<PathBuilder> = None;
    for pair in root.into_inner() {
        match pair.as_rule() {
            Rule::move_cmd => {
                let [x, y] = numbers::<2>(input, pair)?;
                builder = Some(PathBuilder::new(dvec2(x, y)));
            }
            Rule::line_cmd => {
                let [x, y] = numbers::<2>(input, pair)?;
                builder = builder.map(|b| b.line_to(dvec2(x, y)));
            }
            Rule::quad_cmd => {
                let [cx, cy, x, y] = numbers::<4>(input, pair)?;
                builder = builder.map(|b| b.quad_to(dvec2(cx, cy), dvec2(x, y)));
            }
            Rule::cubic_cmd => {
                let [c1x, c1y, c2x, c2y, x, y] = numbers::<6>(input, pair)?;
                builder = builder
                    .map(|b| b.cubic_to(dvec2(c1x, c1y), dvec2(c2x, c2y), dvec2(x, y)));
            }
            Rule::arc_cmd => {
                let mut inner = pair.into_inner();
                let rx = parse_number(input, inner.next().expect("arc rx"))?;
                let ry = parse_number(input, inner.next().expect("arc ry"))?;
                let rotation = parse_number(input, inner.next().expect("arc rotation"))?;
                let large_arc = inner.next().expect("arc large flag").as_str() == "1";
                let sweep = inner.next().expect("arc sweep flag").as_str() == "1";
                let x = parse_number(input, inner.next().expect("arc x"))?;
                let y = parse_number(input, inner.next().expect("arc y"))?;
                builder = builder
                    .map(|b| b.arc_to(dvec2(rx, ry), rotation, large_arc, sweep, dvec2(x, y)));
            }
            Rule::EOI => {}
            rule => unreachable!("unexpected rule in path_data: {rule:?}"),
        }
    }

    // The grammar requires a leading M, so the builder is always present.
    let builder = builder.expect("grammar requires a move command");
    builder.build().map_err(ParseError::from)
}

/// Serialize a path back to path-data text.
pub fn emit_path_data(path: &Path) -> String {
    let start = path.start();
    let mut out = format!("M {} {}", num(start.x), num(start.y));
    for seg in path.segments() {
        match seg {
            Segment::Line(line) => {
                out.push_str(&format!(" L {} {}", num(line.end.x), num(line.end.y)));
            }
            Segment::Quadratic(quad) => {
                out.push_str(&format!(
                    " Q {} {} {} {}",
                    num(quad.control.x),
                    num(quad.control.y),
                    num(quad.end.x),
                    num(quad.end.y)
                ));
            }
            Segment::Cubic(cubic) => {
                push_cubic(&mut out, cubic.control1, cubic.control2, cubic.end);
            }
            Segment::Arc(arc) => {
                // Arcs are normalized on parse and never re-emitted as A.
                for cubic in arc.to_cubics() {
                    push_cubic(&mut out, cubic.control1, cubic.control2, cubic.end);
                }
            }
        }
    }
    out
}

fn push_cubic(out: &mut String, c1: DVec2, c2: DVec2, end: DVec2) {
    out.push_str(&format!(
        " C {} {} {} {} {} {}",
        num(c1.x),
        num(c1.y),
        num(c2.x),
        num(c2.y),
        num(end.x),
        num(end.y)
    ));
}

/// Normalize negative zero so emission is stable.
fn num(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

fn numbers<const N: usize>(input: &str, pair: Pair<'_, Rule>) -> Result<[f64; N], ParseError> {
    let mut out = [0.0; N];
    let mut inner = pair.into_inner();
    for slot in &mut out {
        *slot = parse_number(input, inner.next().expect("grammar fixes arity"))?;
    }
    Ok(out)
}

fn parse_number(input: &str, pair: Pair<'_, Rule>) -> Result<f64, ParseError> {
    let text = pair.as_str();
    let value: f64 = text.parse().map_err(|_| invalid_number(input, &pair))?;
    // Literals like 1e999 overflow to infinity; reject them here rather
    // than letting them poison downstream geometry.
    if !value.is_finite() {
        return Err(invalid_number(input, &pair));
    }
    Ok(value)
}

fn invalid_number(input: &str, pair: &Pair<'_, Rule>) -> ParseError {
    let span = pair.as_span();
    ParseError::InvalidNumber {
        value: pair.as_str().to_string(),
        src: NamedSource::new(SOURCE_NAME, input.to_string()),
        span: SourceSpan::new(span.start().into(), span.end() - span.start()),
    }
}

fn syntax_error(input: &str, error: &pest::error::Error<Rule>) -> ParseError {
    let (offset, len) = match error.location {
        pest::error::InputLocation::Pos(p) => (p.min(input.len()), 0),
        pest::error::InputLocation::Span((s, e)) => (s, e.saturating_sub(s)),
    };
    ParseError::Syntax {
        src: NamedSource::new(SOURCE_NAME, input.to_string()),
        span: SourceSpan::new(offset.into(), len),
        message: error.variant.message().to_string(),
    }
}
