use crate::error::{Result, TraceError};
use crate::path::{PathChain, Point, Segment};
use crate::trace::TraceResult;

/// Renders a trace result as a standalone SVG 1.1 document.
///
/// All chains share one `<path>` so the fill rule sees holes and outers
/// together. A result without chains yields an empty canvas.
pub fn serialize(result: &TraceResult) -> Result<String> {
    let mut d = String::new();
    for (idx, chain) in result.chains.iter().enumerate() {
        if !chain.is_closed() {
            return Err(TraceError::design_violation(format!(
                "chain {} is not closed",
                idx
            )));
        }
        if let Some(gap) = chain.first_gap() {
            return Err(TraceError::design_violation(format!(
                "chain {} breaks before segment {}",
                idx, gap
            )));
        }
        if let Some(p) = chain
            .segments
            .iter()
            .flat_map(|s| s.points())
            .find(|p| !p.is_finite())
        {
            return Err(TraceError::design_violation(format!(
                "chain {} has non-finite coordinate ({}, {})",
                idx, p.x, p.y
            )));
        }
        if !d.is_empty() {
            d.push(' ');
        }
        d.push_str(&path_data(chain));
    }

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" standalone=\"no\"?>\n");
    out.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
        w = result.width,
        h = result.height
    ));
    if !d.is_empty() {
        let [r, g, b] = result.fill_color;
        out.push_str(&format!(
            "<path fill=\"#{:02X}{:02X}{:02X}\" fill-rule=\"{}\" d=\"{}\"/>\n",
            r,
            g,
            b,
            result.fill_rule.as_svg(),
            d
        ));
    }
    out.push_str("</svg>\n");
    Ok(out)
}

/// Absolute `M`/`L`/`C` commands for one chain, closed with `Z`.
pub fn path_data(chain: &PathChain) -> String {
    let mut out = String::new();
    let Some(first) = chain.segments.first() else {
        return out;
    };
    out.push_str(&format!("M{}", coord(first.start())));
    for segment in &chain.segments {
        match *segment {
            Segment::Line { end, .. } => out.push_str(&format!(" L{}", coord(end))),
            Segment::Cubic {
                ctrl1, ctrl2, end, ..
            } => out.push_str(&format!(
                " C{} {} {}",
                coord(ctrl1),
                coord(ctrl2),
                coord(end)
            )),
        }
    }
    out.push_str(" Z");
    out
}

fn coord(p: Point) -> String {
    format!("{},{}", number(p.x), number(p.y))
}

/// Three decimals at most, trailing zeros trimmed, never `-0`.
fn number(value: f64) -> String {
    let mut text = format!("{:.3}", value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}
