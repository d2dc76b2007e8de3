use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
        MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::Backend,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Paragraph},
};
use storyline_core::calendar;
use storyline_core::drag::GestureOutcome;
use storyline_core::TimelineSession;
use storyline_protocol::{Point, RenderCommand, TextAlign, ThemeToken};

/// Surface pixels covered by one terminal column.
const CELL_W: f64 = 8.0;
/// Surface pixels covered by one terminal row.
const CELL_H: f64 = 16.0;
const ZOOM_STEP: f64 = 1.25;
const PAN_FRACTION: f64 = 0.1;

fn theme_to_color(token: ThemeToken) -> Color {
    match token {
        ThemeToken::Background => Color::Black,
        ThemeToken::Border => Color::DarkGray,
        ThemeToken::RulerBackground => Color::Rgb(30, 30, 40),
        ThemeToken::RulerTick => Color::Gray,
        ThemeToken::RulerText => Color::Gray,
        ThemeToken::Gridline => Color::Rgb(50, 50, 60),
        ThemeToken::LaneBackground => Color::Black,
        ThemeToken::LaneBackgroundAlt => Color::Rgb(20, 20, 26),
        ThemeToken::LaneBorder => Color::DarkGray,
        ThemeToken::LaneHeaderText => Color::White,
        ThemeToken::EventFill => Color::Rgb(60, 100, 200),
        ThemeToken::EventMultiFill => Color::Rgb(130, 90, 200),
        ThemeToken::EventBorder => Color::Rgb(80, 120, 220),
        ThemeToken::EventText => Color::White,
        ThemeToken::EventSelected => Color::Yellow,
        ThemeToken::DragPreview => Color::Rgb(40, 160, 120),
        ThemeToken::ResizeHandle => Color::LightYellow,
        ThemeToken::TextPrimary => Color::White,
        ThemeToken::TextMuted => Color::DarkGray,
    }
}

/// Paints render commands into a ratatui buffer, one cell per
/// `CELL_W` x `CELL_H` block of surface pixels.
struct CellPainter<'a> {
    buf: &'a mut Buffer,
    area: Rect,
    transforms: Vec<(Point, Point)>,
    clip: Option<(f64, f64, f64, f64)>,
}

impl<'a> CellPainter<'a> {
    fn new(buf: &'a mut Buffer, area: Rect) -> Self {
        Self {
            buf,
            area,
            transforms: Vec::new(),
            clip: None,
        }
    }

    fn map(&self, x: f64, y: f64) -> (f64, f64) {
        self.transforms
            .iter()
            .rev()
            .fold((x, y), |(x, y), (translate, scale)| {
                (x * scale.x + translate.x, y * scale.y + translate.y)
            })
    }

    /// Surface rectangle to a half-open cell range, clipped to the area and
    /// the active clip.
    fn cells(&self, x: f64, y: f64, w: f64, h: f64) -> Option<(u16, u16, u16, u16)> {
        let (mut x0, mut y0) = self.map(x, y);
        let (mut x1, mut y1) = self.map(x + w, y + h);
        if let Some((cx, cy, cw, ch)) = self.clip {
            x0 = x0.max(cx);
            y0 = y0.max(cy);
            x1 = x1.min(cx + cw);
            y1 = y1.min(cy + ch);
        }
        let col0 = (x0 / CELL_W).floor().max(0.0);
        let row0 = (y0 / CELL_H).floor().max(0.0);
        let col1 = (x1 / CELL_W).ceil().min(f64::from(self.area.width));
        let row1 = (y1 / CELL_H).ceil().min(f64::from(self.area.height));
        if col1 <= col0 || row1 <= row0 {
            return None;
        }
        Some((col0 as u16, row0 as u16, col1 as u16, row1 as u16))
    }

    fn cell(&mut self, col: u16, row: u16) -> Option<&mut ratatui::buffer::Cell> {
        self.buf.cell_mut((self.area.x + col, self.area.y + row))
    }

    fn paint(&mut self, cmd: &RenderCommand) {
        match cmd {
            RenderCommand::DrawRect { rect, color, .. } => {
                let Some((c0, r0, c1, r1)) = self.cells(rect.x, rect.y, rect.w, rect.h) else {
                    return;
                };
                let bg = theme_to_color(*color);
                for row in r0..r1 {
                    for col in c0..c1 {
                        if let Some(cell) = self.cell(col, row) {
                            cell.set_char(' ').set_bg(bg);
                        }
                    }
                }
            }
            RenderCommand::DrawText {
                position,
                text,
                color,
                align,
                ..
            } => {
                let (x, y) = self.map(position.x, position.y);
                let len = text.chars().count() as f64;
                let x = match align {
                    TextAlign::Left => x,
                    TextAlign::Center => x - len * CELL_W / 2.0,
                    TextAlign::Right => x - len * CELL_W,
                };
                let row = ((y - 1.0) / CELL_H).floor();
                let fg = theme_to_color(*color);
                for (i, ch) in text.chars().enumerate() {
                    let cx = x + i as f64 * CELL_W;
                    if !self.visible(cx, row * CELL_H) {
                        continue;
                    }
                    if let Some(cell) = self.cell((cx / CELL_W) as u16, row as u16) {
                        cell.set_char(ch).set_fg(fg);
                    }
                }
            }
            RenderCommand::DrawLine {
                from, to, color, ..
            } => {
                let vertical = (from.x - to.x).abs() < f64::EPSILON;
                let (w, h) = if vertical {
                    (0.0, to.y - from.y)
                } else {
                    (to.x - from.x, 0.0)
                };
                let Some((c0, r0, c1, r1)) = self.cells(from.x, from.y, w.max(1.0), h.max(1.0))
                else {
                    return;
                };
                let glyph = if vertical { '│' } else { '─' };
                let fg = theme_to_color(*color);
                let (c1, r1) = if vertical { (c0 + 1, r1) } else { (c1, r0 + 1) };
                for row in r0..r1 {
                    for col in c0..c1 {
                        // Lines sit under text: only blank cells take the glyph.
                        if let Some(cell) = self.cell(col, row)
                            && cell.symbol() == " "
                        {
                            cell.set_char(glyph).set_fg(fg);
                        }
                    }
                }
            }
            RenderCommand::SetClip { rect } => {
                let (x, y) = self.map(rect.x, rect.y);
                self.clip = Some((x, y, rect.w, rect.h));
            }
            RenderCommand::ClearClip => self.clip = None,
            RenderCommand::PushTransform { translate, scale } => {
                self.transforms.push((*translate, *scale));
            }
            RenderCommand::PopTransform => {
                self.transforms.pop();
            }
            RenderCommand::BeginGroup { .. } | RenderCommand::EndGroup => {}
        }
    }

    fn visible(&self, x: f64, y: f64) -> bool {
        let inside_area = x >= 0.0
            && y >= 0.0
            && x < f64::from(self.area.width) * CELL_W
            && y < f64::from(self.area.height) * CELL_H;
        let inside_clip = self
            .clip
            .is_none_or(|(cx, cy, cw, ch)| x >= cx && x < cx + cw && y >= cy && y < cy + ch);
        inside_area && inside_clip
    }
}

/// Paint a full command list into `area` of `buf`.
fn paint_commands(commands: &[RenderCommand], buf: &mut Buffer, area: Rect) {
    let mut painter = CellPainter::new(buf, area);
    for cmd in commands {
        painter.paint(cmd);
    }
}

/// Surface coordinates of the centre of a terminal cell.
fn cell_to_surface(col: u16, row: u16, area: Rect) -> (f64, f64) {
    (
        (f64::from(col.saturating_sub(area.x)) + 0.5) * CELL_W,
        (f64::from(row.saturating_sub(area.y)) + 0.5) * CELL_H,
    )
}

/// One-line description of the selected or dragged event.
fn status_line(session: &TimelineSession) -> String {
    let focus = session.dragging().or(session.selected());
    let Some(event) = focus.and_then(|id| {
        session
            .layout()
            .into_iter()
            .find(|b| &b.event_id == id)
    }) else {
        let start = calendar::decode(session.viewport().start_time())
            .map(|d| format!("{} {d}", d.weekday_name()))
            .unwrap_or_default();
        return format!(" view from {start} | drag to move, edges to resize ");
    };

    let describe = |t| {
        calendar::decode(t)
            .map(|d| format!("{} {d}", d.weekday_name()))
            .unwrap_or_else(|e| e.to_string())
    };
    format!(
        " {} | {} → {} ",
        event.title,
        describe(event.range.start),
        describe(event.range.end)
    )
}

pub fn render_tui(session: &mut TimelineSession) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, session);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Zoom the session's view, keeping it open if the factor is refused.
fn zoom(session: &mut TimelineSession, factor: f64) {
    if let Err(error) = session.viewport_mut().zoom_by(factor) {
        tracing::warn!(%error, "zoom ignored");
    }
}

fn pan(session: &mut TimelineSession, dx: f64) {
    if let Err(error) = session.viewport_mut().pan_by_pixels(dx) {
        tracing::warn!(%error, "pan ignored");
    }
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, session: &mut TimelineSession) -> Result<()> {
    let mut fitted = false;
    loop {
        let size = terminal.size()?;
        let content = Rect::new(0, 1, size.width, size.height.saturating_sub(2));
        session
            .viewport_mut()
            .on_resize(f64::from(content.width) * CELL_W);
        session.scroll_lanes(0.0, f64::from(content.height) * CELL_H);
        if !fitted {
            session.fit_to_events()?;
            fitted = true;
        }
        let commands = session.render(f64::from(content.height) * CELL_H)?;
        let title = session
            .project()
            .name
            .clone()
            .unwrap_or_else(|| "storyline".to_string());
        let status = status_line(session);

        terminal.draw(|frame| {
            let area = frame.area();

            let header = Block::default()
                .title(format!(
                    " {title} | {} events | ←→ pan | ↑↓ lanes | +/- zoom | f fit | q quit ",
                    session.project().events.len()
                ))
                .style(Style::default().fg(Color::White).bg(Color::DarkGray));
            frame.render_widget(header, Rect::new(0, 0, area.width, 1));

            let background = Block::default().style(Style::default().bg(Color::Black));
            frame.render_widget(background, content);
            paint_commands(&commands, frame.buffer_mut(), content);

            let footer = Paragraph::new(status)
                .style(Style::default().fg(Color::White).bg(Color::DarkGray));
            frame.render_widget(
                footer,
                Rect::new(0, area.height.saturating_sub(1), area.width, 1),
            );
        })?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let width = session.viewport().width();
        let height = f64::from(content.height) * CELL_H;
        let lane_step = session.metrics().lane_height;
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Left => pan(session, -width * PAN_FRACTION),
                KeyCode::Right => pan(session, width * PAN_FRACTION),
                KeyCode::Up => {
                    session.scroll_lanes(-lane_step, height);
                }
                KeyCode::Down => {
                    session.scroll_lanes(lane_step, height);
                }
                KeyCode::Char('+') | KeyCode::Char('=') => zoom(session, ZOOM_STEP),
                KeyCode::Char('-') => zoom(session, 1.0 / ZOOM_STEP),
                KeyCode::Char('f') => {
                    if let Err(error) = session.fit_to_events() {
                        tracing::warn!(%error, "fit ignored");
                    }
                }
                _ => {}
            },
            Event::Mouse(mouse) => {
                let (x, y) = cell_to_surface(mouse.column, mouse.row, content);
                match mouse.kind {
                    MouseEventKind::Down(MouseButton::Left) => {
                        if let Some(hit) = session.pointer_down(x, y) {
                            tracing::debug!(
                                event_id = %hit.event_id,
                                kind = ?hit.kind,
                                "pointer down"
                            );
                        }
                    }
                    MouseEventKind::Drag(MouseButton::Left) => session.pointer_move(x),
                    MouseEventKind::Up(MouseButton::Left) => match session.pointer_up() {
                        Ok(Some(GestureOutcome::Select { event_id })) => {
                            tracing::debug!(%event_id, "event selected");
                        }
                        Ok(_) => {}
                        Err(error) => tracing::warn!(%error, "edit discarded"),
                    },
                    MouseEventKind::ScrollUp => zoom(session, ZOOM_STEP),
                    MouseEventKind::ScrollDown => zoom(session, 1.0 / ZOOM_STEP),
                    MouseEventKind::ScrollLeft => pan(session, -CELL_W * 4.0),
                    MouseEventKind::ScrollRight => pan(session, CELL_W * 4.0),
                    _ => {}
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyline_protocol::Rect as SurfaceRect;

    fn area() -> Rect {
        Rect::new(0, 1, 20, 6)
    }

    fn row_text(buf: &Buffer, row: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, row)].symbol().to_string())
            .collect()
    }

    #[test]
    fn rects_fill_covered_cells() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 20, 7));
        let cmds = [RenderCommand::DrawRect {
            rect: SurfaceRect::new(16.0, 16.0, 24.0, 32.0),
            color: ThemeToken::EventFill,
            border_color: None,
            label: None,
            event_id: Some("e".into()),
        }];
        paint_commands(&cmds, &mut buf, area());
        let fill = theme_to_color(ThemeToken::EventFill);
        assert_eq!(buf[(2, 2)].bg, fill);
        assert_eq!(buf[(4, 3)].bg, fill);
        assert_ne!(buf[(5, 2)].bg, fill);
        assert_ne!(buf[(2, 1)].bg, fill);
    }

    #[test]
    fn transforms_offset_text() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 20, 7));
        let cmds = [
            RenderCommand::PushTransform {
                translate: Point::new(0.0, 32.0),
                scale: Point::new(1.0, 1.0),
            },
            RenderCommand::DrawText {
                position: Point::new(8.0, 14.0),
                text: "Ada".into(),
                color: ThemeToken::LaneHeaderText,
                font_size: 11.0,
                align: TextAlign::Left,
            },
            RenderCommand::PopTransform,
        ];
        paint_commands(&cmds, &mut buf, area());
        // Surface row 2, shifted by the area's top row.
        assert!(row_text(&buf, 3).starts_with(" Ada"));
    }

    #[test]
    fn clip_hides_text_outside() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 20, 7));
        let cmds = [
            RenderCommand::SetClip {
                rect: SurfaceRect::new(0.0, 0.0, 24.0, 96.0),
            },
            RenderCommand::DrawText {
                position: Point::new(0.0, 14.0),
                text: "Council".into(),
                color: ThemeToken::EventText,
                font_size: 12.0,
                align: TextAlign::Left,
            },
            RenderCommand::ClearClip,
        ];
        paint_commands(&cmds, &mut buf, area());
        assert!(row_text(&buf, 1).starts_with("Cou "));
    }

    #[test]
    fn cell_centres_map_back_to_surface() {
        assert_eq!(cell_to_surface(0, 1, area()), (4.0, 8.0));
        assert_eq!(cell_to_surface(3, 4, area()), (28.0, 56.0));
    }
}
