use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use impact_sim::app::App;
use impact_sim::config::SimConfig;
use impact_sim::report::{GeminiClient, ReportGenerator};
use impact_sim::ui;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    let (config, config_error) = match SimConfig::read(&SimConfig::path()) {
        Ok(config) => (config.unwrap_or_default(), None),
        Err(e) => (SimConfig::default(), Some(e)),
    };

    init_logging(&config.log_file)?;
    if let Some(e) = config_error {
        log::warn!("Ignoring config file, using defaults: {}", e);
    }

    let client = GeminiClient::new(&config.report_endpoint, &config.report_model, SimConfig::api_key())?;
    if !client.has_api_key() {
        log::warn!("No API key set, damage reports will use the fallback assessment");
    }
    let generator: Arc<dyn ReportGenerator> = Arc::new(client);

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, config, generator);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// The TUI owns the terminal, so diagnostics go to a file
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Handle mouse events for targeting, panning and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track mouse position for cursor marker
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Click designates, click and drag pans
        MouseEventKind::Down(MouseButton::Left) => app.begin_press(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_press(mouse.column, mouse.row),
        _ => {}
    }
}

fn handle_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Fire control
        KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Char('f') => app.launch(),
        KeyCode::Char('r') => app.reset(),

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),
        KeyCode::Char('0') => app.reset_view(),

        // Layer toggles
        KeyCode::Char('o') | KeyCode::Char('O') => app.map_renderer.toggle_outlines(),
        KeyCode::Char('g') | KeyCode::Char('G') => app.map_renderer.toggle_graticule(),
        KeyCode::Char('L') => app.map_renderer.toggle_labels(),
        KeyCode::Char('t') | KeyCode::Char('T') => app.map_renderer.toggle_trajectories(),

        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: SimConfig, generator: Arc<dyn ReportGenerator>) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config, generator, size.width, size.height);
    app.load_world();

    let mut last_tick = Instant::now();

    // Main loop
    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key.code),
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        let now = Instant::now();
        app.tick(now - last_tick);
        last_tick = now;

        if app.should_quit {
            break;
        }
    }

    log::info!("Shutting down");
    Ok(())
}
