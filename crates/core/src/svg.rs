//! SVG export: turns a `RenderCommand` list into a standalone document.

use std::fmt::Write as _;

use storyline_protocol::{RenderCommand, TextAlign, ThemeToken};

/// Render a list of commands as an SVG document string.
///
/// `width` and `height` set the viewBox; `dark` selects the palette. Clips
/// and transforms nest as `<clipPath>` and `<g>` elements.
pub fn render_svg(commands: &[RenderCommand], width: f64, height: f64, dark: bool) -> String {
    let mut svg = String::with_capacity(commands.len() * 160);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}""#,
    );
    let _ = write!(
        svg,
        r#" width="{width}" height="{height}" style="font-family:system-ui,sans-serif">"#,
    );
    let _ = write!(
        svg,
        r#"<rect width="{width}" height="{height}" fill="{}"/>"#,
        resolve_color(ThemeToken::Background, dark),
    );

    let mut clips = 0usize;
    let mut clip_open = false;
    for cmd in commands {
        match cmd {
            RenderCommand::DrawRect {
                rect,
                color,
                border_color,
                label,
                event_id,
            } => {
                let _ = write!(
                    svg,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" rx="2""#,
                    rect.x,
                    rect.y,
                    rect.w,
                    rect.h,
                    resolve_color(*color, dark),
                );
                if let Some(border) = border_color {
                    let _ = write!(svg, r#" stroke="{}""#, resolve_color(*border, dark));
                }
                if let Some(id) = event_id {
                    let _ = write!(svg, r#" data-event="{}""#, escape_xml(id));
                }
                svg.push('>');
                if let Some(label) = label {
                    let _ = write!(svg, "<title>{}</title>", escape_xml(label));
                }
                svg.push_str("</rect>");
            }
            RenderCommand::DrawLine {
                from,
                to,
                color,
                width: line_width,
            } => {
                let _ = write!(
                    svg,
                    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"/>"#,
                    from.x,
                    from.y,
                    to.x,
                    to.y,
                    resolve_color(*color, dark),
                    line_width,
                );
            }
            RenderCommand::DrawText {
                text,
                position,
                color,
                font_size,
                align,
            } => {
                let anchor = match align {
                    TextAlign::Left => "start",
                    TextAlign::Center => "middle",
                    TextAlign::Right => "end",
                };
                let _ = write!(
                    svg,
                    r#"<text x="{}" y="{}" fill="{}" font-size="{font_size}""#,
                    position.x,
                    position.y,
                    resolve_color(*color, dark),
                );
                let _ = write!(svg, r#" text-anchor="{anchor}">"#);
                let _ = write!(svg, "{}</text>", escape_xml(text));
            }
            RenderCommand::SetClip { rect } => {
                if clip_open {
                    svg.push_str("</g>");
                }
                clips += 1;
                let _ = write!(
                    svg,
                    r#"<clipPath id="clip{clips}"><rect x="{}" y="{}" width="{}" height="{}"/>"#,
                    rect.x, rect.y, rect.w, rect.h,
                );
                let _ = write!(svg, r#"</clipPath><g clip-path="url(#clip{clips})">"#);
                clip_open = true;
            }
            RenderCommand::ClearClip => {
                if clip_open {
                    svg.push_str("</g>");
                    clip_open = false;
                }
            }
            RenderCommand::PushTransform { translate, scale } => {
                let _ = write!(
                    svg,
                    r#"<g transform="translate({} {}) scale({} {})">"#,
                    translate.x, translate.y, scale.x, scale.y,
                );
            }
            RenderCommand::PopTransform => svg.push_str("</g>"),
            RenderCommand::BeginGroup { id, .. } => {
                let _ = write!(svg, r#"<g id="{}">"#, escape_xml(id));
            }
            RenderCommand::EndGroup => svg.push_str("</g>"),
        }
    }
    if clip_open {
        svg.push_str("</g>");
    }

    svg.push_str("</svg>");
    svg
}

fn resolve_color(token: ThemeToken, dark: bool) -> &'static str {
    if dark {
        match token {
            ThemeToken::Background => "#16161e",
            ThemeToken::Border | ThemeToken::LaneBorder => "#2e2e3a",
            ThemeToken::RulerBackground => "#1f1f2b",
            ThemeToken::RulerTick | ThemeToken::Gridline => "#3a3a4a",
            ThemeToken::RulerText | ThemeToken::TextMuted => "#9e9eae",
            ThemeToken::LaneBackground => "#1a1a24",
            ThemeToken::LaneBackgroundAlt => "#20202c",
            ThemeToken::LaneHeaderText | ThemeToken::TextPrimary | ThemeToken::EventText => {
                "#ececf4"
            }
            ThemeToken::EventFill => "#3f6fd8",
            ThemeToken::EventMultiFill => "#8a5cd6",
            ThemeToken::EventBorder => "#5a85e6",
            ThemeToken::EventSelected => "#ffd60a",
            ThemeToken::DragPreview => "#2fa37a",
            ThemeToken::ResizeHandle => "#ffffff",
        }
    } else {
        match token {
            ThemeToken::Background => "#ffffff",
            ThemeToken::Border | ThemeToken::LaneBorder => "#dee2e6",
            ThemeToken::RulerBackground => "#f1f3f5",
            ThemeToken::RulerTick | ThemeToken::Gridline => "#ced4da",
            ThemeToken::RulerText | ThemeToken::TextMuted => "#666677",
            ThemeToken::LaneBackground => "#f8f9fa",
            ThemeToken::LaneBackgroundAlt => "#eef1f4",
            ThemeToken::LaneHeaderText | ThemeToken::TextPrimary => "#1a1a2e",
            ThemeToken::EventText => "#ffffff",
            ThemeToken::EventFill => "#457b9d",
            ThemeToken::EventMultiFill => "#7b5ea7",
            ThemeToken::EventBorder => "#1d3557",
            ThemeToken::EventSelected => "#e63946",
            ThemeToken::DragPreview => "#2a9d8f",
            ThemeToken::ResizeHandle => "#1a1a2e",
        }
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyline_protocol::{Point, Rect};

    fn block(label: &str) -> RenderCommand {
        RenderCommand::DrawRect {
            rect: Rect::new(10.0, 20.0, 100.0, 72.0),
            color: ThemeToken::EventFill,
            border_color: Some(ThemeToken::EventBorder),
            label: Some(label.into()),
            event_id: Some("siege".into()),
        }
    }

    #[test]
    fn basic_svg_output() {
        let svg = render_svg(&[block("Siege")], 800.0, 400.0, true);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("<title>Siege</title>"));
        assert!(svg.contains(r#"data-event="siege""#));
        assert!(svg.contains("#3f6fd8"));
    }

    #[test]
    fn escapes_xml_entities() {
        let svg = render_svg(&[block("Tom & Jerry <3")], 400.0, 100.0, false);
        assert!(svg.contains("Tom &amp; Jerry &lt;3"));
    }

    #[test]
    fn nests_clips_and_transforms() {
        let commands = vec![
            RenderCommand::SetClip {
                rect: Rect::new(0.0, 32.0, 400.0, 68.0),
            },
            RenderCommand::PushTransform {
                translate: Point::new(0.0, 32.0),
                scale: Point::new(1.0, 1.0),
            },
            block("Siege"),
            RenderCommand::PopTransform,
            RenderCommand::ClearClip,
        ];
        let svg = render_svg(&commands, 400.0, 100.0, false);
        assert!(svg.contains(r#"clip-path="url(#clip1)""#));
        assert!(svg.contains("translate(0 32)"));
        assert_eq!(svg.matches("<g").count(), svg.matches("</g>").count());
    }
}
