use crate::animation::Theater;
use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_circle, draw_line, draw_marker, draw_ring};
use crate::map::projection::Viewport;
use crate::mission::{Mission, MissionStatus};

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Graticule spacing in degrees
const GRATICULE_STEP: i32 = 30;

/// Display settings for map layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_outlines: bool,
    pub show_graticule: bool,
    pub show_labels: bool,
    pub show_trajectories: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_outlines: true,
            show_graticule: false,
            show_labels: true,
            show_trajectories: true,
        }
    }
}

/// What a text overlay marks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelKind {
    Hq,
    Lock,
    Impact,
}

/// Text drawn over the braille layers, in character coordinates
#[derive(Clone, Debug)]
pub struct Label {
    pub x: u16,
    pub y: u16,
    pub text: String,
    pub kind: LabelKind,
}

/// Braille layers, back to front. The UI gives each its own colour.
pub struct MapLayers {
    pub graticule: BrailleCanvas,
    pub land: BrailleCanvas,
    pub trails: BrailleCanvas,
    pub fading_trails: BrailleCanvas,
    pub hq: BrailleCanvas,
    pub targets: BrailleCanvas,
    pub shockwaves: BrailleCanvas,
    pub fire: BrailleCanvas,
    pub hot: BrailleCanvas,
    pub labels: Vec<Label>,
}

impl MapLayers {
    fn new(width: usize, height: usize) -> Self {
        Self {
            graticule: BrailleCanvas::new(width, height),
            land: BrailleCanvas::new(width, height),
            trails: BrailleCanvas::new(width, height),
            fading_trails: BrailleCanvas::new(width, height),
            hq: BrailleCanvas::new(width, height),
            targets: BrailleCanvas::new(width, height),
            shockwaves: BrailleCanvas::new(width, height),
            fire: BrailleCanvas::new(width, height),
            hot: BrailleCanvas::new(width, height),
            labels: Vec::new(),
        }
    }
}

/// Simulation state the renderer draws on top of the map
pub struct Overlay<'a> {
    pub hq: (f64, f64),
    pub missions: &'a [Mission],
    pub theater: &'a Theater,
}

/// Map renderer for country outlines plus the strike overlay
pub struct MapRenderer {
    outlines: Vec<LineString>,
    /// True while only the built-in coarse outline is loaded
    placeholder: bool,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            outlines: Vec::new(),
            placeholder: false,
            settings: DisplaySettings::default(),
        }
    }

    /// Add a single outline ring
    pub fn add_outline(&mut self, line: LineString) {
        self.outlines.push(line);
    }

    /// Replace every outline, e.g. when real boundaries arrive
    pub fn set_outlines(&mut self, outlines: Vec<LineString>) {
        self.outlines = outlines;
        self.placeholder = false;
    }

    /// Flag the current outlines as the coarse built-in fallback
    pub fn mark_placeholder(&mut self) {
        self.placeholder = true;
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Check if any data is loaded
    pub fn has_data(&self) -> bool {
        !self.outlines.is_empty()
    }

    pub fn outline_count(&self) -> usize {
        self.outlines.len()
    }

    pub fn toggle_outlines(&mut self) {
        self.settings.show_outlines = !self.settings.show_outlines;
    }

    pub fn toggle_graticule(&mut self) {
        self.settings.show_graticule = !self.settings.show_graticule;
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    pub fn toggle_trajectories(&mut self) {
        self.settings.show_trajectories = !self.settings.show_trajectories;
    }

    /// Render the map and overlay into per-colour layers.
    /// `width`/`height` are in terminal cells.
    pub fn render(&self, width: usize, height: usize, viewport: &Viewport, overlay: &Overlay) -> MapLayers {
        let mut layers = MapLayers::new(width, height);

        if self.settings.show_graticule {
            draw_graticule(&mut layers.graticule, viewport);
        }

        if self.settings.show_outlines {
            for line in &self.outlines {
                draw_linestring(&mut layers.land, line, viewport, 0);
            }
        }

        if self.settings.show_trajectories {
            for flight in &overlay.theater.flights {
                draw_linestring(&mut layers.trails, flight.path(), viewport, 2);
            }
            for trail in &overlay.theater.trails {
                let canvas = if trail.opacity() > 0.5 {
                    &mut layers.trails
                } else {
                    &mut layers.fading_trails
                };
                draw_linestring(canvas, trail.path(), viewport, 2);
            }
        }

        // Launch site
        let (hx, hy) = viewport.project(overlay.hq.0, overlay.hq.1);
        if viewport.is_visible(hx, hy) {
            draw_circle(&mut layers.hq, hx, hy, 1);
            draw_ring(&mut layers.hq, hx, hy, 3.0, 0);
            self.push_label(&mut layers.labels, (hx, hy), (width, height), "HQ", LabelKind::Hq);
        }

        for mission in overlay.missions {
            let (px, py) = viewport.project(mission.target.lon, mission.target.lat);
            if !viewport.is_visible(px, py) {
                continue;
            }
            match mission.status() {
                MissionStatus::Armed => {
                    draw_marker(&mut layers.targets, px, py, 4);
                    draw_ring(&mut layers.targets, px, py, 6.0, 2);
                    self.push_label(&mut layers.labels, (px, py), (width, height), "LOCK", LabelKind::Lock);
                }
                status if status.is_hit() => {
                    draw_circle(&mut layers.targets, px, py, 2);
                    draw_ring(&mut layers.targets, px, py, 4.0, 1);
                    self.push_label(&mut layers.labels, (px, py), (width, height), "IMPACT", LabelKind::Impact);
                }
                _ => {}
            }
        }

        for flight in &overlay.theater.flights {
            let (lon, lat) = flight.position();
            let (px, py) = viewport.project(lon, lat);
            draw_circle(&mut layers.hot, px, py, 1);
        }

        for blast in &overlay.theater.blasts {
            let (cx, cy) = viewport.project(blast.lon, blast.lat);
            if !viewport.is_visible(cx, cy) {
                continue;
            }

            if let Some((radius, opacity)) = blast.flash() {
                if opacity >= 0.5 {
                    draw_circle(&mut layers.hot, cx, cy, radius.round() as i32);
                } else if opacity > 0.15 {
                    draw_ring(&mut layers.hot, cx, cy, radius, 0);
                }
            }

            for radius in blast.shockwaves() {
                draw_ring(&mut layers.shockwaves, cx, cy, radius, 0);
            }

            if let Some((radius, opacity)) = blast.fireball() {
                if opacity > 0.4 {
                    draw_circle(&mut layers.fire, cx, cy, radius.round() as i32);
                } else {
                    draw_ring(&mut layers.fire, cx, cy, radius, 1);
                }
            }

            for ((dx, dy), warm) in blast.debris() {
                let canvas = if warm { &mut layers.shockwaves } else { &mut layers.fire };
                draw_line(canvas, cx, cy, cx + dx.round() as i32, cy + dy.round() as i32);
            }
        }

        layers
    }

    /// Queue a label two cells right of a pixel position
    fn push_label(
        &self,
        labels: &mut Vec<Label>,
        (px, py): (i32, i32),
        (width, height): (usize, usize),
        text: &str,
        kind: LabelKind,
    ) {
        if !self.settings.show_labels || px < 0 || py < 0 {
            return;
        }
        let x = px as usize / 2 + 2;
        let y = py as usize / 4;
        if x < width && y < height {
            labels.push(Label {
                x: x as u16,
                y: y as u16,
                text: text.to_string(),
                kind,
            });
        }
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw a linestring with viewport culling. `dash` > 0 draws segments in
/// runs of `dash` and skips as many.
fn draw_linestring(canvas: &mut BrailleCanvas, line: &[(f64, f64)], viewport: &Viewport, dash: usize) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;

    for (i, &(lon, lat)) in line.iter().enumerate() {
        let (px, py) = viewport.project(lon, lat);

        if let Some((prev_x, prev_y)) = prev {
            let on = dash == 0 || (i / dash) % 2 == 0;
            // Segments that jump most of the screen are antimeridian wraps
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if on && dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }

        prev = Some((px, py));
    }
}

/// Dotted meridians and parallels
fn draw_graticule(canvas: &mut BrailleCanvas, viewport: &Viewport) {
    for lon in (-180..=180).step_by(GRATICULE_STEP as usize) {
        for lat in (-80..=80).step_by(2) {
            let (px, py) = viewport.project(lon as f64, lat as f64);
            canvas.set_pixel_signed(px, py);
        }
    }
    for lat in (-60..=60).step_by(GRATICULE_STEP as usize) {
        for lon in (-180..=180).step_by(2) {
            let (px, py) = viewport.project(lon as f64, lat as f64);
            canvas.set_pixel_signed(px, py);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::{MissionId, Simulation, Target};
    use std::time::Duration;

    const DC: (f64, f64) = (-77.0369, 38.9072);

    fn viewport() -> Viewport {
        // 80x20 cells
        Viewport::world(160, 80)
    }

    #[test]
    fn test_outlines_drawn() {
        let mut renderer = MapRenderer::new();
        renderer.add_outline(vec![(-20.0, 0.0), (20.0, 0.0), (20.0, 30.0)]);
        let theater = Theater::new();
        let overlay = Overlay { hq: DC, missions: &[], theater: &theater };
        let layers = renderer.render(80, 20, &viewport(), &overlay);
        assert!(!layers.land.is_empty());
        assert!(layers.targets.is_empty());
        assert!(!layers.hq.is_empty());
        assert!(layers.labels.iter().any(|l| l.kind == LabelKind::Hq));
    }

    #[test]
    fn test_armed_and_hit_markers() {
        let mut sim = Simulation::new();
        let hit = sim.select_target(Target::new(10.0, 45.0));
        sim.launch();
        sim.impact(hit).unwrap();
        sim.select_target(Target::new(100.0, 30.0));

        let renderer = MapRenderer::new();
        let theater = Theater::new();
        let overlay = Overlay { hq: DC, missions: sim.missions(), theater: &theater };
        let layers = renderer.render(80, 20, &viewport(), &overlay);

        assert!(!layers.targets.is_empty());
        let kinds: Vec<LabelKind> = layers.labels.iter().map(|l| l.kind).collect();
        assert!(kinds.contains(&LabelKind::Lock));
        assert!(kinds.contains(&LabelKind::Impact));
    }

    #[test]
    fn test_flight_and_blast_layers() {
        let mut theater = Theater::new();
        let id = MissionId::generate();
        theater.launch(id, DC, (-0.1, 51.5), Duration::from_millis(1000));
        theater.advance(Duration::from_millis(500));

        let renderer = MapRenderer::new();
        let overlay = Overlay { hq: DC, missions: &[], theater: &theater };
        let layers = renderer.render(80, 20, &viewport(), &overlay);
        assert!(!layers.trails.is_empty());
        assert!(!layers.hot.is_empty());

        theater.advance(Duration::from_millis(600));
        theater.advance(Duration::from_millis(150));
        let overlay = Overlay { hq: DC, missions: &[], theater: &theater };
        let layers = renderer.render(80, 20, &viewport(), &overlay);
        assert!(!layers.shockwaves.is_empty());
        assert!(!layers.fire.is_empty());
    }

    #[test]
    fn test_labels_hidden_when_toggled_off() {
        let mut renderer = MapRenderer::new();
        renderer.toggle_labels();
        let theater = Theater::new();
        let overlay = Overlay { hq: DC, missions: &[], theater: &theater };
        let layers = renderer.render(80, 20, &viewport(), &overlay);
        assert!(layers.labels.is_empty());
    }

    #[test]
    fn test_outline_toggle() {
        let mut renderer = MapRenderer::new();
        renderer.add_outline(vec![(-20.0, 0.0), (20.0, 0.0), (20.0, 30.0)]);
        let theater = Theater::new();
        let overlay = Overlay { hq: DC, missions: &[], theater: &theater };
        renderer.toggle_outlines();
        assert!(renderer.render(80, 20, &viewport(), &overlay).land.is_empty());
        renderer.toggle_outlines();
        assert!(!renderer.render(80, 20, &viewport(), &overlay).land.is_empty());
    }

    #[test]
    fn test_graticule_toggle() {
        let mut renderer = MapRenderer::new();
        let theater = Theater::new();
        let overlay = Overlay { hq: DC, missions: &[], theater: &theater };
        assert!(renderer.render(80, 20, &viewport(), &overlay).graticule.is_empty());
        renderer.toggle_graticule();
        assert!(!renderer.render(80, 20, &viewport(), &overlay).graticule.is_empty());
    }

    #[test]
    fn test_set_outlines_clears_placeholder() {
        let mut renderer = MapRenderer::new();
        renderer.add_outline(vec![(0.0, 0.0), (1.0, 1.0)]);
        renderer.mark_placeholder();
        assert!(renderer.is_placeholder());
        renderer.set_outlines(vec![vec![(0.0, 0.0), (2.0, 2.0)], vec![(3.0, 3.0), (4.0, 4.0)]]);
        assert!(!renderer.is_placeholder());
        assert_eq!(renderer.outline_count(), 2);
    }
}
