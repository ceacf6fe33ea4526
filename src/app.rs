use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use ratatui::layout::Rect;

use crate::animation::Theater;
use crate::config::SimConfig;
use crate::data::{self, DataError};
use crate::map::{LineString, MapRenderer, Overlay, Viewport};
use crate::mission::{Simulation, Target};
use crate::report::{ReportDispatcher, ReportGenerator};
use crate::ui;

type WorldReceiver = Receiver<Result<Vec<LineString>, DataError>>;

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub simulation: Simulation,
    pub theater: Theater,
    pub config: SimConfig,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Set once a press turns into a drag, so release doesn't designate
    dragged: bool,
    /// Inner map rectangle in terminal cells
    map_area: Rect,
    reports: ReportDispatcher,
    world_rx: Option<WorldReceiver>,
}

impl App {
    pub fn new(config: SimConfig, generator: Arc<dyn ReportGenerator>, width: u16, height: u16) -> Self {
        let map_area = ui::map_inner(Rect::new(0, 0, width, height));
        // Braille gives 2x4 resolution per character
        let viewport = Viewport::world(map_area.width as usize * 2, map_area.height as usize * 4);

        Self {
            viewport,
            map_renderer: MapRenderer::new(),
            simulation: Simulation::new(),
            theater: Theater::new(),
            config,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            dragged: false,
            map_area,
            reports: ReportDispatcher::new(generator),
            world_rx: None,
        }
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.map_area = ui::map_inner(Rect::new(0, 0, width, height));
        self.viewport.width = self.map_area.width as usize * 2;
        self.viewport.height = self.map_area.height as usize * 4;
    }

    /// Load local boundaries, or show the coarse outline and fetch the real
    /// ones in the background.
    pub fn load_world(&mut self) {
        let data_dir = self.config.data_dir.clone();
        match data::load_local(&mut self.map_renderer, &data_dir) {
            Ok(count) if count > 0 => return,
            Ok(_) => {}
            Err(e) => log::warn!("Failed to read local boundaries in {}: {}", data_dir.display(), e),
        }

        data::generate_simple_world(&mut self.map_renderer);
        self.world_rx = Some(data::spawn_world_fetch(self.config.world_url.clone(), data_dir));
    }

    /// Pick up downloaded boundaries if the fetch has finished
    fn poll_world(&mut self) {
        let Some(rx) = &self.world_rx else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(outlines)) => {
                log::info!("World boundaries ready: {} outlines", outlines.len());
                self.map_renderer.set_outlines(outlines);
                self.world_rx = None;
            }
            Ok(Err(e)) => {
                log::warn!("World boundaries unavailable, keeping built-in outline: {}", e);
                self.world_rx = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => self.world_rx = None,
        }
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_pixel(col, row) {
            self.viewport.zoom_in_at(px, py);
        }
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_pixel(col, row) {
            self.viewport.zoom_out_at(px, py);
        }
    }

    /// Back to the whole-world view
    pub fn reset_view(&mut self) {
        self.viewport = Viewport::world(self.viewport.width, self.viewport.height);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Terminal cell to braille pixel, `None` outside the map panel.
    /// Each cell is 2 pixels wide and 4 tall; the left dot of the second
    /// row is used, the cell centre rounded down.
    pub fn cell_to_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.map_area;
        if col < area.x || row < area.y || col >= area.x + area.width || row >= area.y + area.height {
            return None;
        }
        let px = (col - area.x) as i32 * 2;
        let py = (row - area.y) as i32 * 4 + 1;
        Some((px, py))
    }

    /// Mouse position relative to the map panel, in cells
    pub fn cursor_cell(&self) -> Option<(u16, u16)> {
        let (col, row) = self.mouse_pos?;
        self.cell_to_pixel(col, row)?;
        Some((col - self.map_area.x, row - self.map_area.y))
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    pub fn begin_press(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            if dx != 0 || dy != 0 {
                self.dragged = true;
            }
            // Less sensitive when zoomed out
            let scale = if self.viewport.zoom < 2.0 {
                2
            } else if self.viewport.zoom < 4.0 {
                3
            } else {
                4
            };
            self.pan(dx * scale, dy * scale);
        }
        self.last_mouse = Some((x, y));
    }

    /// Button released: a press that never moved designates a target
    pub fn end_press(&mut self, col: u16, row: u16) {
        if self.last_mouse.is_some() && !self.dragged {
            self.select_target_at(col, row);
        }
        self.last_mouse = None;
        self.dragged = false;
    }

    /// Arm a mission at the map point under a terminal cell
    pub fn select_target_at(&mut self, col: u16, row: u16) {
        let Some((px, py)) = self.cell_to_pixel(col, row) else {
            return;
        };
        let (lon, lat) = self.viewport.unproject(px, py);
        let target = Target::new(lon, lat);
        log::info!("Target designated at {:.3}, {:.3} ({})", lon, lat, target.name);
        self.simulation.select_target(target);
    }

    /// Fire everything that is armed
    pub fn launch(&mut self) {
        let hq = self.config.hq();
        let launched = self.simulation.launch();
        for (id, target) in &launched {
            let to = target.position();
            let duration = self.config.flight_duration(to);
            log::debug!("Mission {} in flight for {:?}", id, duration);
            self.theater.launch(*id, hq, to, duration);
        }
        if !launched.is_empty() {
            log::info!("Launched {} mission(s)", launched.len());
        }
    }

    /// Forget every mission, report and animation. Pending assessments are
    /// dropped when they arrive.
    pub fn reset(&mut self) {
        self.simulation.reset();
        self.theater.clear();
        log::info!("Simulation reset");
    }

    /// Advance one frame
    pub fn tick(&mut self, dt: Duration) {
        for id in self.theater.advance(dt) {
            match self.simulation.impact(id) {
                Ok(target) => self.reports.request(id, target.name),
                Err(e) => log::debug!("Ignoring landing: {}", e),
            }
        }

        for outcome in self.reports.drain() {
            if let Err(e) = &outcome.result {
                log::warn!("Assessment for mission {} failed: {}", outcome.mission_id, e);
            }
            if let Err(e) = self.simulation.settle(outcome.mission_id, outcome.result) {
                log::debug!("Discarding assessment: {}", e);
            }
        }

        self.poll_world();
    }

    /// Viewport to draw this frame, with any screen shake applied
    pub fn render_viewport(&self) -> Viewport {
        let mut viewport = self.viewport.clone();
        let (dx, dy) = self.theater.shake_offset();
        if dx != 0 || dy != 0 {
            viewport.pan(dx, dy);
        }
        viewport
    }

    pub fn overlay(&self) -> Overlay<'_> {
        Overlay {
            hq: self.config.hq(),
            missions: self.simulation.missions(),
            theater: &self.theater,
        }
    }

    pub fn pending_reports(&self) -> usize {
        self.reports.in_flight()
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        format!(
            "{:.1}°{}, {:.1}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    /// Where the drawn boundaries came from
    pub fn world_source(&self) -> &'static str {
        if self.world_rx.is_some() {
            "loading"
        } else if self.map_renderer.is_placeholder() {
            "coarse"
        } else if self.map_renderer.has_data() {
            "110m"
        } else {
            "none"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::MissionStatus;
    use crate::report::tests::{CannedGenerator, GatedGenerator, OfflineGenerator};
    use crate::report::FALLBACK_SUMMARY;
    use std::sync::mpsc;
    use std::time::Instant;

    fn app_with(generator: Arc<dyn ReportGenerator>) -> App {
        App::new(SimConfig::default(), generator, 120, 40)
    }

    fn map_center(app: &App) -> (u16, u16) {
        let area = app.map_area;
        (area.x + area.width / 2, area.y + area.height / 2)
    }

    /// Tick until `n` reports are filed or two seconds pass
    fn tick_until_reports(app: &mut App, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while app.simulation.reports().len() < n && Instant::now() < deadline {
            app.tick(Duration::from_millis(16));
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_click_designates_target() {
        let mut app = app_with(Arc::new(CannedGenerator));
        let (col, row) = map_center(&app);
        app.begin_press(col, row);
        app.end_press(col, row);

        let missions = app.simulation.missions();
        assert_eq!(missions.len(), 1);
        assert_eq!(missions[0].status(), MissionStatus::Armed);
        // The centre cell maps close to the viewport centre
        assert!((missions[0].target.lon - app.viewport.center_lon).abs() < 5.0);
        assert!((missions[0].target.lat - app.viewport.center_lat).abs() < 5.0);
    }

    #[test]
    fn test_drag_pans_without_designating() {
        let mut app = app_with(Arc::new(CannedGenerator));
        let (col, row) = map_center(&app);
        let before = app.viewport.center_lon;
        app.begin_press(col, row);
        app.handle_drag(col - 5, row);
        app.end_press(col - 5, row);

        assert!(app.simulation.missions().is_empty());
        assert_ne!(app.viewport.center_lon, before);
    }

    #[test]
    fn test_click_outside_map_is_ignored() {
        let mut app = app_with(Arc::new(CannedGenerator));
        // Header row
        app.begin_press(2, 0);
        app.end_press(2, 0);
        // Sidebar
        app.select_target_at(119, 20);
        assert!(app.simulation.missions().is_empty());
        assert_eq!(app.cell_to_pixel(119, 20), None);
    }

    #[test]
    fn test_cell_to_pixel_stays_in_cell() {
        let app = app_with(Arc::new(CannedGenerator));
        let area = app.map_area;
        assert_eq!(app.cell_to_pixel(area.x, area.y), Some((0, 1)));

        let (col, row) = (area.x + 7, area.y + 5);
        let (px, py) = app.cell_to_pixel(col, row).unwrap();
        assert_eq!((px / 2, py / 4), (7, 5));

        // Designated point projects back into the clicked cell
        let (lon, lat) = app.viewport.unproject(px, py);
        let (bx, by) = app.viewport.project(lon, lat);
        assert_eq!((bx / 2, by / 4), (7, 5));
    }

    #[test]
    fn test_strike_completes_with_report() {
        let (generator, open) = GatedGenerator::new();
        let mut app = app_with(Arc::new(generator));
        let (col, row) = map_center(&app);
        app.select_target_at(col, row);
        app.launch();
        assert_eq!(app.simulation.missions()[0].status(), MissionStatus::Launching);
        assert_eq!(app.theater.flights.len(), 1);

        // Longest flight is base + pi radians
        app.tick(Duration::from_secs(10));
        let mission = &app.simulation.missions()[0];
        assert_eq!(mission.status(), MissionStatus::Analyzing);
        assert_eq!(app.pending_reports(), 1);
        assert!(!app.theater.blasts.is_empty());

        open.send(()).unwrap();
        tick_until_reports(&mut app, 1);
        let mission = &app.simulation.missions()[0];
        assert_eq!(mission.status(), MissionStatus::Complete);
        assert_eq!(mission.history(), &MissionStatus::SEQUENCE);
        let reports = app.simulation.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].mission_id, mission.id);
        assert_eq!(reports[0].assessment.summary, "Sector neutralized.");
        assert_eq!(app.pending_reports(), 0);
    }

    #[test]
    fn test_failed_assessment_files_fallback() {
        let mut app = app_with(Arc::new(OfflineGenerator));
        let (col, row) = map_center(&app);
        app.select_target_at(col, row);
        app.launch();
        app.tick(Duration::from_secs(10));
        tick_until_reports(&mut app, 1);

        assert_eq!(app.simulation.missions()[0].status(), MissionStatus::Complete);
        assert_eq!(app.simulation.reports()[0].assessment.summary, FALLBACK_SUMMARY);
        assert!(app
            .simulation
            .logs()
            .iter()
            .any(|l| l.starts_with("Failed to analyze Sector")));
    }

    #[test]
    fn test_reset_mid_flight() {
        let mut app = app_with(Arc::new(CannedGenerator));
        let (col, row) = map_center(&app);
        app.select_target_at(col, row);
        app.launch();
        app.tick(Duration::from_millis(100));
        app.reset();

        assert!(app.theater.is_idle());
        app.tick(Duration::from_secs(10));
        assert!(app.simulation.missions().is_empty());
        assert!(app.simulation.reports().is_empty());
    }

    #[test]
    fn test_late_assessment_after_reset_is_dropped() {
        let mut app = app_with(Arc::new(CannedGenerator));
        let (col, row) = map_center(&app);
        app.select_target_at(col, row);
        app.launch();
        app.tick(Duration::from_secs(10));
        app.reset();

        let deadline = Instant::now() + Duration::from_secs(2);
        while app.pending_reports() > 0 && Instant::now() < deadline {
            app.tick(Duration::from_millis(16));
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(app.simulation.reports().is_empty());
        assert_eq!(app.simulation.logs().len(), 2);
    }

    #[test]
    fn test_launch_with_nothing_armed() {
        let mut app = app_with(Arc::new(CannedGenerator));
        let logs_before = app.simulation.logs().len();
        app.launch();
        assert!(app.theater.flights.is_empty());
        assert_eq!(app.simulation.logs().len(), logs_before);
    }

    #[test]
    fn test_world_arrival_replaces_placeholder() {
        let mut app = app_with(Arc::new(CannedGenerator));
        data::generate_simple_world(&mut app.map_renderer);
        let (tx, rx) = mpsc::channel();
        app.world_rx = Some(rx);
        assert_eq!(app.world_source(), "loading");

        app.tick(Duration::ZERO);
        assert_eq!(app.world_source(), "loading");

        tx.send(Ok(vec![vec![(0.0, 0.0), (1.0, 1.0)]])).unwrap();
        app.tick(Duration::ZERO);
        assert_eq!(app.world_source(), "110m");
        assert_eq!(app.map_renderer.outline_count(), 1);
    }

    #[test]
    fn test_world_failure_keeps_placeholder() {
        let mut app = app_with(Arc::new(CannedGenerator));
        data::generate_simple_world(&mut app.map_renderer);
        let (tx, rx) = mpsc::channel();
        app.world_rx = Some(rx);
        tx.send(Err(DataError::MissingObject("countries".to_string()))).unwrap();
        app.tick(Duration::ZERO);
        assert_eq!(app.world_source(), "coarse");
    }

    #[test]
    fn test_reset_view() {
        let mut app = app_with(Arc::new(CannedGenerator));
        app.zoom_in();
        app.pan(30, 10);
        app.reset_view();
        assert_eq!(app.viewport.zoom, 1.0);
        assert_eq!(app.viewport.center_lon, 0.0);
    }

    #[test]
    fn test_resize_tracks_map_panel() {
        let mut app = app_with(Arc::new(CannedGenerator));
        app.resize(200, 60);
        assert_eq!(app.viewport.width, app.map_area.width as usize * 2);
        assert_eq!(app.viewport.height, app.map_area.height as usize * 4);
        assert!(app.map_area.width > 100);
    }
}
