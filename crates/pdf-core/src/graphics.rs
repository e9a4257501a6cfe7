//! Vector drawing operators (rectangles, rounded rectangles, lines)

use crate::document::Color;
use crate::text::fmt_num;

/// Bezier control point factor for approximating quarter circles
const KAPPA: f64 = 0.552_284_749_8;

/// Axis-aligned rectangle in PDF space (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Fill and stroke settings for a shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeStyle {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub line_width: f64,
}

impl ShapeStyle {
    /// Stroke only
    pub fn stroke(color: Color, line_width: f64) -> Self {
        Self {
            fill: None,
            stroke: Some(color),
            line_width,
        }
    }

    /// Fill only
    pub fn fill(color: Color) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
            line_width: 0.0,
        }
    }

    /// Fill and stroke
    pub fn fill_and_stroke(fill: Color, stroke: Color, line_width: f64) -> Self {
        Self {
            fill: Some(fill),
            stroke: Some(stroke),
            line_width,
        }
    }

    fn is_visible(&self) -> bool {
        self.fill.is_some() || (self.stroke.is_some() && self.line_width > 0.0)
    }

    fn paint_operator(&self) -> &'static str {
        let stroke = self.stroke.is_some() && self.line_width > 0.0;
        match (self.fill.is_some(), stroke) {
            (true, true) => "B",
            (true, false) => "f",
            _ => "S",
        }
    }

    fn push_state(&self, ops: &mut String) {
        if let Some(fill) = self.fill {
            ops.push_str(&format!("{} rg\n", color_triplet(fill)));
        }
        if let Some(stroke) = self.stroke {
            ops.push_str(&format!("{} RG\n", color_triplet(stroke)));
            ops.push_str(&format!("{} w\n", fmt_num(self.line_width)));
        }
    }
}

fn color_triplet(color: Color) -> String {
    format!(
        "{} {} {}",
        fmt_num(color.r as f64),
        fmt_num(color.g as f64),
        fmt_num(color.b as f64)
    )
}

/// Generate operators for a plain rectangle
pub fn generate_rect_operators(rect: Rect, style: &ShapeStyle) -> Vec<u8> {
    if !style.is_visible() {
        return Vec::new();
    }
    let mut ops = String::from("q\n");
    style.push_state(&mut ops);
    ops.push_str(&format!(
        "{} {} {} {} re\n{}\nQ\n",
        fmt_num(rect.x),
        fmt_num(rect.y),
        fmt_num(rect.width),
        fmt_num(rect.height),
        style.paint_operator()
    ));
    ops.into_bytes()
}

/// Generate operators for a rectangle with uniformly rounded corners
///
/// The radius is clamped to half of the shorter side.
pub fn generate_rounded_rect_operators(rect: Rect, radius: f64, style: &ShapeStyle) -> Vec<u8> {
    let r = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
    if r == 0.0 {
        return generate_rect_operators(rect, style);
    }
    if !style.is_visible() {
        return Vec::new();
    }

    let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);
    let k = r * KAPPA;
    let n = fmt_num;

    let mut ops = String::from("q\n");
    style.push_state(&mut ops);
    ops.push_str(&format!("{} {} m\n", n(x + r), n(y)));
    ops.push_str(&format!("{} {} l\n", n(x + w - r), n(y)));
    ops.push_str(&format!(
        "{} {} {} {} {} {} c\n",
        n(x + w - r + k),
        n(y),
        n(x + w),
        n(y + r - k),
        n(x + w),
        n(y + r)
    ));
    ops.push_str(&format!("{} {} l\n", n(x + w), n(y + h - r)));
    ops.push_str(&format!(
        "{} {} {} {} {} {} c\n",
        n(x + w),
        n(y + h - r + k),
        n(x + w - r + k),
        n(y + h),
        n(x + w - r),
        n(y + h)
    ));
    ops.push_str(&format!("{} {} l\n", n(x + r), n(y + h)));
    ops.push_str(&format!(
        "{} {} {} {} {} {} c\n",
        n(x + r - k),
        n(y + h),
        n(x),
        n(y + h - r + k),
        n(x),
        n(y + h - r)
    ));
    ops.push_str(&format!("{} {} l\n", n(x), n(y + r)));
    ops.push_str(&format!(
        "{} {} {} {} {} {} c\n",
        n(x),
        n(y + r - k),
        n(x + r - k),
        n(y),
        n(x + r),
        n(y)
    ));
    ops.push_str(&format!("h\n{}\nQ\n", style.paint_operator()));
    ops.into_bytes()
}

/// Generate operators for a straight line segment
pub fn generate_line_operators(
    from: (f64, f64),
    to: (f64, f64),
    color: Color,
    line_width: f64,
) -> Vec<u8> {
    if line_width <= 0.0 {
        return Vec::new();
    }
    format!(
        "q\n{} RG\n{} w\n{} {} m\n{} {} l\nS\nQ\n",
        color_triplet(color),
        fmt_num(line_width),
        fmt_num(from.0),
        fmt_num(from.1),
        fmt_num(to.0),
        fmt_num(to.1)
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_stroke() {
        let ops = generate_rect_operators(
            Rect::new(10.0, 20.0, 30.0, 40.0),
            &ShapeStyle::stroke(Color::black(), 1.0),
        );
        let s = String::from_utf8(ops).unwrap();
        assert!(s.contains("0 0 0 RG"));
        assert!(s.contains("10 20 30 40 re"));
        assert!(s.contains("\nS\n"));
    }

    #[test]
    fn test_rect_fill_and_stroke() {
        let style = ShapeStyle::fill_and_stroke(Color::white(), Color::black(), 0.5);
        let s = String::from_utf8(generate_rect_operators(Rect::new(0.0, 0.0, 1.0, 1.0), &style))
            .unwrap();
        assert!(s.contains("1 1 1 rg"));
        assert!(s.contains("0.5 w"));
        assert!(s.contains("\nB\n"));
    }

    #[test]
    fn test_invisible_style_emits_nothing() {
        let style = ShapeStyle {
            fill: None,
            stroke: Some(Color::black()),
            line_width: 0.0,
        };
        assert!(generate_rect_operators(Rect::new(0.0, 0.0, 1.0, 1.0), &style).is_empty());
    }

    #[test]
    fn test_rounded_rect_uses_curves() {
        let style = ShapeStyle::stroke(Color::black(), 1.0);
        let s = String::from_utf8(generate_rounded_rect_operators(
            Rect::new(0.0, 0.0, 100.0, 50.0),
            8.0,
            &style,
        ))
        .unwrap();
        assert_eq!(s.matches(" c\n").count(), 4);
        assert!(s.contains("8 0 m"));
    }

    #[test]
    fn test_rounded_rect_zero_radius_is_plain() {
        let style = ShapeStyle::fill(Color::black());
        let s = String::from_utf8(generate_rounded_rect_operators(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            0.0,
            &style,
        ))
        .unwrap();
        assert!(s.contains("re"));
    }

    #[test]
    fn test_line() {
        let s = String::from_utf8(generate_line_operators(
            (0.0, 0.0),
            (100.0, 0.0),
            Color::black(),
            0.75,
        ))
        .unwrap();
        assert!(s.contains("0 0 m"));
        assert!(s.contains("100 0 l"));
        assert!(s.contains("0.75 w"));
    }
}
