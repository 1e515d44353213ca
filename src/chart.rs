// src/chart.rs
use crate::models::LaggedRow;
use std::fmt::Write;

const WIDTH: f64 = 400.0;
const HEIGHT: f64 = 300.0;
const LEFT: f64 = 52.0;
const RIGHT: f64 = 12.0;
const TOP: f64 = 28.0;
const BOTTOM: f64 = 44.0;
const GRID_LINES: usize = 4;

/// Renders closes over date as a standalone SVG line chart.
pub fn render_svg(ticker: &str, rows: &[LaggedRow]) -> String {
    let title = format!("{} Closing Prices", escape(ticker));
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" font-family="sans-serif" role="img" aria-label="{title}">"#,
        w = WIDTH,
        h = HEIGHT,
        title = title
    );
    let _ = write!(
        svg,
        r#"<rect width="{}" height="{}" fill="white"/><text x="{}" y="18" text-anchor="middle" font-size="12">{}</text>"#,
        WIDTH,
        HEIGHT,
        WIDTH / 2.0,
        title
    );

    if rows.is_empty() {
        svg.push_str("</svg>");
        return svg;
    }

    let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        (lo.min(r.close), hi.max(r.close))
    });
    let (min, max) = if max > min { (min, max) } else { (min - 1.0, max + 1.0) };

    let plot_w = WIDTH - LEFT - RIGHT;
    let plot_h = HEIGHT - TOP - BOTTOM;
    let x_at = |i: usize| {
        if rows.len() == 1 {
            LEFT + plot_w / 2.0
        } else {
            LEFT + plot_w * i as f64 / (rows.len() - 1) as f64
        }
    };
    let y_at = |v: f64| TOP + plot_h * (1.0 - (v - min) / (max - min));

    for step in 0..=GRID_LINES {
        let value = min + (max - min) * step as f64 / GRID_LINES as f64;
        let y = y_at(value);
        let _ = write!(
            svg,
            r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#ddd"/><text x="{:.1}" y="{:.1}" text-anchor="end" font-size="8">{:.2}</text>"##,
            LEFT,
            y,
            WIDTH - RIGHT,
            y,
            LEFT - 4.0,
            y + 3.0,
            value
        );
    }

    for &i in &[0, rows.len() / 2, rows.len() - 1] {
        let x = x_at(i);
        let _ = write!(
            svg,
            r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#ddd"/><text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="6">{}</text>"##,
            x,
            TOP,
            x,
            HEIGHT - BOTTOM,
            x,
            HEIGHT - BOTTOM + 10.0,
            rows[i].date
        );
    }

    let points = rows
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{:.1},{:.1}", x_at(i), y_at(r.close)))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = write!(
        svg,
        r#"<polyline fill="none" stroke="blue" stroke-width="1" points="{}"/>"#,
        points
    );

    let _ = write!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="10">Date</text><text x="12" y="{:.1}" text-anchor="middle" font-size="10" transform="rotate(-90 12 {:.1})">Price (USD)</text></svg>"#,
        LEFT + plot_w / 2.0,
        HEIGHT - 8.0,
        TOP + plot_h / 2.0,
        TOP + plot_h / 2.0
    );
    svg
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
