use anyhow::{anyhow, Result};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ssrt_core::{DemographicRecord, Display, DisplayCommand, DisplayError, KeyEvent};
use ssrt_experiment::{ExperimentSession, JsonlStore, SessionReport};
use ssrt_render::{load_font, RedrawGate, Scene, SkiaRenderer};
use ssrt_timing::{ChannelSource, HighPrecisionTimer};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Fullscreen, Window, WindowId},
};

use crate::keys;
use crate::settings::AppSettings;

/// Messages from the session thread to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    Display(DisplayCommand),
    SessionFinished,
}

/// Display collaborator living on the session thread; every command is
/// relayed to the window through the event-loop proxy.
pub struct ProxyDisplay {
    proxy: EventLoopProxy<AppEvent>,
    ready: bool,
}

impl Display for ProxyDisplay {
    fn apply(&mut self, command: DisplayCommand) -> Result<(), DisplayError> {
        self.proxy
            .send_event(AppEvent::Display(command))
            .map_err(|_| DisplayError::Disconnected)
    }

    fn ensure_ready(&mut self) -> Result<(), DisplayError> {
        if self.ready {
            Ok(())
        } else {
            Err(DisplayError::MissingRegion("stimulus"))
        }
    }
}

pub struct App {
    settings: AppSettings,
    proxy: EventLoopProxy<AppEvent>,
    store: Option<JsonlStore>,
    demographic: Option<DemographicRecord>,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    scene: Scene,
    redraw: RedrawGate,
    keys: Option<mpsc::Sender<KeyEvent>>,
    session: Option<JoinHandle<SessionReport>>,
    report: Option<SessionReport>,
}

impl App {
    /// Opens the window, runs one session to completion and returns its report.
    pub fn run(
        settings: AppSettings,
        store: JsonlStore,
        demographic: Option<DemographicRecord>,
    ) -> Result<Option<SessionReport>> {
        let event_loop = EventLoop::<AppEvent>::with_user_event().build()?;
        tracing::info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "starting stop-signal task"
        );

        let mut app = App {
            settings,
            proxy: event_loop.create_proxy(),
            store: Some(store),
            demographic,
            window: None,
            pixels: None,
            renderer: None,
            scene: Scene::new(),
            redraw: RedrawGate::default(),
            keys: None,
            session: None,
            report: None,
        };
        event_loop.run_app(&mut app)?;
        Ok(app.report.take())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("No monitor available"))?;

        let window_attributes = Window::default_attributes()
            .with_title("Stop-Signal Task")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor.clone()))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let size = window.inner_size();
        tracing::info!(
            width = size.width,
            height = size.height,
            scale_factor = window.scale_factor(),
            refresh_hz = ?primary_monitor.refresh_rate_millihertz().map(|mhz| mhz as f64 / 1000.0),
            "display configured"
        );

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface_texture)?);

        self.renderer = match load_font(&self.settings.font_path)
            .and_then(|font| SkiaRenderer::new(size.width, size.height, font))
        {
            Ok(renderer) => Some(renderer),
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "renderer unavailable");
                None
            }
        };

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    /// Spawns the session thread. Without a renderer the session still runs
    /// its setup check, fails it and goes straight to submission.
    fn start_session(&mut self) -> Result<()> {
        let Some(store) = self.store.take() else {
            return Ok(());
        };
        let (tx, rx) = mpsc::channel();
        self.keys = Some(tx);

        let config = self.settings.experiment.clone();
        let seed = self.settings.seed;
        let participant_id = self.settings.participant_id.clone();
        let demographic = self.demographic.take();
        let display = ProxyDisplay {
            proxy: self.proxy.clone(),
            ready: self.renderer.is_some(),
        };
        let proxy = self.proxy.clone();

        let handle = std::thread::Builder::new()
            .name("ssrt-session".into())
            .spawn(move || {
                let rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                let mut session = ExperimentSession::new(
                    config,
                    HighPrecisionTimer::new(),
                    ChannelSource::new(rx),
                    display,
                    rng,
                    store,
                );
                if let Some(id) = participant_id {
                    session = session.with_participant(id);
                }
                if let Some(record) = demographic {
                    session = session.with_demographic(record);
                }
                let report = session.run();
                if proxy.send_event(AppEvent::SessionFinished).is_err() {
                    tracing::warn!("event loop closed before the session finished");
                }
                report
            })?;
        self.session = Some(handle);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let Some(pixels) = self.pixels.as_mut() else {
            return Ok(());
        };
        let frame = pixels.frame_mut();
        match self.renderer.as_mut() {
            // The frame buffer still holds this revision; just present it.
            Some(_) if !self.redraw.needs_draw(&self.scene) => {}
            Some(renderer) => {
                let stats = match renderer.render(&self.scene, frame) {
                    Ok(stats) => stats,
                    Err(e) => {
                        self.redraw.invalidate();
                        return Err(e);
                    }
                };
                tracing::trace!(
                    draw_ms = stats.draw.as_secs_f64() * 1e3,
                    copy_ms = stats.copy.as_secs_f64() * 1e3,
                    blits = stats.blits,
                    "frame"
                );
            }
            None => frame.fill(0),
        }
        pixels.render()?;
        Ok(())
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                tracing::warn!(error = %e, "failed to resize surface");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                tracing::warn!(error = %e, "failed to resize buffer");
            }
        }
        self.redraw.invalidate();
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                tracing::warn!(error = %format!("{e:#}"), "failed to resize renderer");
            }
        }
        tracing::debug!(width = new_size.width, height = new_size.height, "display resized");
    }

    fn finish_session(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(handle) = self.session.take() {
            match handle.join() {
                Ok(report) => self.report = Some(report),
                Err(_) => tracing::error!("session thread panicked"),
            }
        }
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        event_loop.exit();
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create_window_and_surface(event_loop) {
            tracing::error!(error = %format!("{e:#}"), "failed to create window and surface");
        }
        if let Err(e) = self.start_session() {
            tracing::error!(error = %e, "failed to start session thread");
            event_loop.exit();
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Display(command) => {
                self.scene.apply(command);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            AppEvent::SessionFinished => self.finish_session(event_loop),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                // The session reads the closed channel as abort and still submits.
                tracing::info!("window close requested");
                self.keys = None;
                if self.session.is_none() {
                    event_loop.exit();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    tracing::warn!(error = %format!("{e:#}"), "frame render failed");
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let Some(key) = keys::translate(&event) else {
                    return;
                };
                tracing::trace!(key = %key.key, code = %key.code, "key press");
                let sent = self.keys.as_ref().map(|tx| tx.send(key).is_ok());
                if sent == Some(false) {
                    self.keys = None;
                }
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }
}
