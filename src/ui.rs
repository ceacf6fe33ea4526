use crate::app::App;
use crate::braille::BrailleCanvas;
use crate::map::{LabelKind, MapLayers};
use crate::mission::MissionStatus;
use crate::report::Report;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};

/// Header, map, sidebar and status bar rectangles
fn split(area: Rect) -> (Rect, Rect, Rect, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(3),    // Body
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
        .split(rows[1]);

    (rows[0], body[0], body[1], rows[2])
}

fn panel(title: &str, accent: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        ))
}

/// Map panel interior for a given terminal size. Mouse hit-testing uses
/// the same rectangle the map is drawn into.
pub fn map_inner(area: Rect) -> Rect {
    let (_, map, _, _) = split(area);
    panel("", Color::Reset).inner(map)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let (header, map, sidebar, status) = split(frame.area());

    render_header(frame, app, header);
    render_map(frame, app, map);
    render_sidebar(frame, app, sidebar);
    render_status_bar(frame, app, status);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let active = app.simulation.active_count();
    let line = Line::from(vec![
        Span::styled(
            " GLOBAL IMPACT SIM ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::styled("│ HQ: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.config.hq_name.as_str(), Style::default().fg(Color::Blue)),
        Span::styled(" │ ACTIVE OPS: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            active.to_string(),
            Style::default().fg(if active > 0 { Color::Yellow } else { Color::Green }),
        ),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel("Theater", Color::Cyan);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut viewport = app.render_viewport();
    // Braille gives 2x4 resolution per character
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let overlay = app.overlay();
    let layers = app
        .map_renderer
        .render(inner.width as usize, inner.height as usize, &viewport, &overlay);

    let map_widget = MapWidget {
        layers,
        cursor_pos: app.cursor_cell(),
    };
    frame.render_widget(map_widget, inner);
}

/// Braille map with text labels overlaid
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        let rows = canvas.height().min(area.height as usize);
        let cols = canvas.width().min(area.width as usize);
        for cy in 0..rows {
            for cx in 0..cols {
                if let Some(ch) = canvas.glyph(cx, cy) {
                    let x = area.x + cx as u16;
                    let y = area.y + cy as u16;
                    buf[(x, y)].set_char(ch).set_fg(color);
                }
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front
        let layers = &self.layers;
        Self::render_layer(&layers.graticule, Color::DarkGray, area, buf);
        Self::render_layer(&layers.land, Color::Green, area, buf);
        Self::render_layer(&layers.fading_trails, Color::DarkGray, area, buf);
        Self::render_layer(&layers.trails, Color::Red, area, buf);
        Self::render_layer(&layers.hq, Color::Blue, area, buf);
        Self::render_layer(&layers.targets, Color::Red, area, buf);
        Self::render_layer(&layers.shockwaves, Color::Yellow, area, buf);
        Self::render_layer(&layers.fire, Color::LightRed, area, buf);
        Self::render_layer(&layers.hot, Color::White, area, buf);

        for label in &layers.labels {
            if label.y >= area.height || label.x >= area.width {
                continue;
            }
            let color = match label.kind {
                LabelKind::Hq => Color::LightBlue,
                LabelKind::Lock => Color::Red,
                LabelKind::Impact => Color::Yellow,
            };
            let style = Style::default().fg(color).add_modifier(Modifier::BOLD);

            let max_len = (area.width - label.x) as usize;
            for (i, ch) in label.text.chars().take(max_len).enumerate() {
                buf[(area.x + label.x + i as u16, area.y + label.y)]
                    .set_char(ch)
                    .set_style(style);
            }
        }

        if let Some((cx, cy)) = self.cursor_pos {
            if cx < area.width && cy < area.height {
                buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),      // Fire control
            Constraint::Percentage(35), // System log
            Constraint::Min(4),         // Reports
        ])
        .split(area);

    render_fire_control(frame, app, sections[0]);
    render_log(frame, app, sections[1]);
    render_reports(frame, app, sections[2]);
}

fn render_fire_control(frame: &mut Frame, app: &App, area: Rect) {
    let armed = app.simulation.armed_count();
    let key = Style::default().fg(Color::Yellow);
    let dim = Style::default().fg(Color::DarkGray);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("ARMED: ", dim),
            Span::styled(
                armed.to_string(),
                Style::default()
                    .fg(if armed > 0 { Color::Red } else { Color::Green })
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("  ANALYZING: ", dim),
            Span::styled(app.pending_reports().to_string(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::styled("click", key),
            Span::styled(" designate  ", dim),
            Span::styled("space", key),
            Span::styled(if armed > 0 { " LAUNCH" } else { " launch" }, dim),
        ]),
        Line::from(vec![Span::styled("r", key), Span::styled(" reset all", dim)]),
    ];
    if let Some(latest) = app.simulation.missions().last() {
        let status = latest.status();
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", latest.id.tag()), dim),
            Span::styled(
                status.label(),
                Style::default().fg(if status.is_hit() { Color::Yellow } else { Color::Red }),
            ),
        ]));
    }

    let block = panel("Fire Control", Color::Red);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_log(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel("System Log", Color::Green);
    let visible = block.inner(area).height as usize;

    let logs = app.simulation.logs();
    let start = logs.len().saturating_sub(visible);
    let lines: Vec<Line> = logs[start..]
        .iter()
        .map(|l| {
            Line::from(vec![
                Span::styled("> ", Style::default().fg(Color::DarkGray)),
                Span::styled(l.as_str(), Style::default().fg(Color::Green)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_reports(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel("Damage Assessment", Color::Yellow);
    let reports = app.simulation.reports();

    let lines: Vec<Line> = if reports.is_empty() {
        vec![Line::from(Span::styled(
            "No assessments filed.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        reports.iter().flat_map(|r| report_card(app, r)).collect()
    };

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn report_card<'a>(app: &App, report: &'a Report) -> Vec<Line<'a>> {
    let dim = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White);
    let field = |name: &'static str, text: &'a str| {
        Line::from(vec![Span::styled(name, dim), Span::styled(text, value)])
    };

    let assessment = &report.assessment;
    let complete = app
        .simulation
        .mission(report.mission_id)
        .is_some_and(|m| m.status() == MissionStatus::Complete);

    vec![
        Line::from(vec![
            Span::styled(
                assessment.location.as_str(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" [{}]", report.mission_id.tag()),
                if complete { dim } else { Style::default().fg(Color::Red) },
            ),
        ]),
        field("Radius: ", &assessment.impact_radius),
        field("Casualties: ", &assessment.casualty_estimate),
        field("Infrastructure: ", &assessment.infrastructure_damage),
        field("Environment: ", &assessment.environmental_impact),
        Line::from(Span::styled(
            assessment.summary.as_str(),
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )),
        Line::default(),
    ]
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.map_renderer.settings;
    let toggle = |on: bool, on_text: &'static str, off_text: &'static str| {
        Span::styled(
            if on { on_text } else { off_text },
            Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
        )
    };

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", Style::default().fg(Color::DarkGray)),
        Span::styled(app.world_source(), Style::default().fg(Color::Magenta)),
        Span::styled(") ", Style::default().fg(Color::DarkGray)),
        toggle(settings.show_outlines, "[O]utline ", "[o]utline "),
        toggle(settings.show_graticule, "[G]rid ", "[g]rid "),
        toggle(settings.show_labels, "[L]abels ", "[l]abels "),
        toggle(settings.show_trajectories, "[T]rails ", "[t]rails "),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(
            " | hjkl:pan +/-:zoom 0:view q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}
