// src/app.rs
//! Application loop.
//!
//! [`TartanApp`] owns a [`Window`] and a [`Renderer`] and drives the frame
//! protocol: pump events, clear, run the caller's frame, present.
//! [`WinitWindow`] opens a desktop window; [`HeadlessWindow`] replays
//! scripted input without a display.

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;
#[cfg(not(any(target_family = "wasm", target_os = "ios")))]
use std::time::{Duration, Instant};

use cgmath::Matrix4;
use winit::keyboard::KeyCode;
#[cfg(not(any(target_family = "wasm", target_os = "ios")))]
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{WindowAttributes, WindowId},
};

use crate::error::{GfxError, GfxResult};
use crate::gfx::device::{HeadlessDevice, SharedDevice};
use crate::gfx::{Renderer, RendererConfig};

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Seconds advanced per headless frame.
    pub delta_time: f32,
    /// Frames a headless window runs before requesting a stop.
    pub frame_budget: Option<u64>,
    pub renderer: RendererConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            title: "tartan".to_string(),
            delta_time: 1.0 / 60.0,
            frame_budget: Some(600),
            renderer: RendererConfig::default(),
        }
    }
}

impl AppConfig {
    /// Builder pattern: sets the window size in pixels
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builder pattern: sets the window title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder pattern: sets the fixed headless frame time
    pub fn with_delta_time(mut self, delta_time: f32) -> Self {
        self.delta_time = delta_time;
        self
    }

    /// Builder pattern: limits headless runs to `frames` frames, `None` runs
    /// until Escape is pressed
    pub fn with_frame_budget(mut self, frames: Option<u64>) -> Self {
        self.frame_budget = frames;
        self
    }

    /// Builder pattern: sets the renderer settings
    pub fn with_renderer_config(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// What the application loop needs from a window.
pub trait Window {
    /// Processes one frame of window events. Returns `true` once the
    /// application should stop.
    fn process_events(&mut self) -> bool;

    /// Seconds elapsed over the last frame.
    fn delta_time(&self) -> f32;

    fn is_key_down(&self, key: KeyCode) -> bool;

    /// Every key currently held.
    fn keys_down(&self) -> Vec<KeyCode>;

    fn size(&self) -> (u32, u32);

    fn title(&self) -> &str;
}

/// Window without a display: fixed frame time, optional frame budget and
/// key presses scripted per frame. Escape requests a stop.
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    title: String,
    size: (u32, u32),
    delta_time: f32,
    frame_budget: Option<u64>,
    frame: u64,
    script: BTreeMap<u64, Vec<(KeyCode, bool)>>,
    pressed: HashSet<KeyCode>,
}

impl HeadlessWindow {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            title: config.title.clone(),
            size: (config.width, config.height),
            delta_time: config.delta_time,
            frame_budget: config.frame_budget,
            frame: 0,
            script: BTreeMap::new(),
            pressed: HashSet::new(),
        }
    }

    /// Builder pattern: presses `key` when frame `frame` (zero based) is processed
    pub fn with_key_press(mut self, frame: u64, key: KeyCode) -> Self {
        self.script.entry(frame).or_default().push((key, true));
        self
    }

    /// Builder pattern: releases `key` when frame `frame` is processed
    pub fn with_key_release(mut self, frame: u64, key: KeyCode) -> Self {
        self.script.entry(frame).or_default().push((key, false));
        self
    }

    /// Frames processed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl Window for HeadlessWindow {
    fn process_events(&mut self) -> bool {
        if self.frame_budget.is_some_and(|budget| self.frame >= budget) {
            return true;
        }

        if let Some(events) = self.script.remove(&self.frame) {
            for (key, down) in events {
                if down {
                    self.pressed.insert(key);
                } else {
                    self.pressed.remove(&key);
                }
            }
        }
        self.frame += 1;

        self.pressed.contains(&KeyCode::Escape)
    }

    fn delta_time(&self) -> f32 {
        self.delta_time
    }

    fn is_key_down(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    fn keys_down(&self) -> Vec<KeyCode> {
        self.pressed.iter().copied().collect()
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn title(&self) -> &str {
        &self.title
    }
}

/// Desktop window driven by a winit event loop, pumped once per frame.
/// Closing the window or pressing Escape requests a stop.
#[cfg(not(any(target_family = "wasm", target_os = "ios")))]
pub struct WinitWindow {
    event_loop: EventLoop<()>,
    state: WinitState,
}

#[cfg(not(any(target_family = "wasm", target_os = "ios")))]
struct WinitState {
    title: String,
    size: (u32, u32),
    window: Option<winit::window::Window>,
    pressed: HashSet<KeyCode>,
    exit_requested: bool,
    last_frame: Instant,
    delta_time: f32,
}

#[cfg(not(any(target_family = "wasm", target_os = "ios")))]
impl WinitWindow {
    /// Creates the event loop. The native window opens on the first
    /// [`process_events`](Window::process_events).
    pub fn new(config: &AppConfig) -> GfxResult<Self> {
        let event_loop =
            EventLoop::new().map_err(|error| GfxError::Window(error.to_string()))?;
        Ok(Self {
            event_loop,
            state: WinitState {
                title: config.title.clone(),
                size: (config.width, config.height),
                window: None,
                pressed: HashSet::new(),
                exit_requested: false,
                last_frame: Instant::now(),
                delta_time: config.delta_time,
            },
        })
    }

    /// The native window, once the platform has created it.
    pub fn native_window(&self) -> Option<&winit::window::Window> {
        self.state.window.as_ref()
    }
}

#[cfg(not(any(target_family = "wasm", target_os = "ios")))]
impl WinitState {
    fn key_input(&mut self, key_code: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if key_code == KeyCode::Escape {
                    self.exit_requested = true;
                }
                self.pressed.insert(key_code);
            }
            ElementState::Released => {
                self.pressed.remove(&key_code);
            }
        }
    }
}

#[cfg(not(any(target_family = "wasm", target_os = "ios")))]
impl ApplicationHandler for WinitState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(self.size.0, self.size.1));
        match event_loop.create_window(attributes) {
            Ok(window) => {
                let size = window.inner_size();
                self.size = (size.width, size.height);
                self.window = Some(window);
            }
            Err(error) => {
                log::error!("failed to create window '{}': {}", self.title, error);
                self.exit_requested = true;
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.exit_requested = true;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.size = (size.width, size.height);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state,
                        ..
                    },
                ..
            } => {
                self.key_input(key_code, state);
                if self.exit_requested {
                    event_loop.exit();
                }
            }
            WindowEvent::Focused(false) => self.pressed.clear(),
            _ => {}
        }
    }
}

#[cfg(not(any(target_family = "wasm", target_os = "ios")))]
impl Window for WinitWindow {
    fn process_events(&mut self) -> bool {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state);

        let now = Instant::now();
        self.state.delta_time = now.duration_since(self.state.last_frame).as_secs_f32();
        self.state.last_frame = now;

        matches!(status, PumpStatus::Exit(_)) || self.state.exit_requested
    }

    fn delta_time(&self) -> f32 {
        self.state.delta_time
    }

    fn is_key_down(&self, key: KeyCode) -> bool {
        self.state.pressed.contains(&key)
    }

    fn keys_down(&self) -> Vec<KeyCode> {
        self.state.pressed.iter().copied().collect()
    }

    fn size(&self) -> (u32, u32) {
        self.state.size
    }

    fn title(&self) -> &str {
        &self.state.title
    }
}

/// Called every frame in which at least one key is held.
pub type KeysDownHandler = Box<dyn FnMut(&[KeyCode], &mut Renderer, f32)>;

pub struct TartanApp<W: Window = HeadlessWindow> {
    window: W,
    renderer: Renderer,
    keys_down_handler: Option<KeysDownHandler>,
}

impl TartanApp<HeadlessWindow> {
    /// Headless window and device built from `config`.
    pub fn headless(config: AppConfig) -> Self {
        let window = HeadlessWindow::new(&config);
        let device: SharedDevice = Rc::new(HeadlessDevice::new());
        Self::new(window, device, config.renderer)
    }
}

#[cfg(not(any(target_family = "wasm", target_os = "ios")))]
impl TartanApp<WinitWindow> {
    /// Desktop window built from `config`, drawing through `device`.
    pub fn windowed(config: AppConfig, device: SharedDevice) -> GfxResult<Self> {
        let window = WinitWindow::new(&config)?;
        Ok(Self::new(window, device, config.renderer))
    }
}

impl<W: Window> TartanApp<W> {
    pub fn new(window: W, device: SharedDevice, renderer_config: RendererConfig) -> Self {
        Self {
            window,
            renderer: Renderer::new(device, renderer_config),
            keys_down_handler: None,
        }
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Seconds elapsed over the last frame.
    pub fn get_dt(&self) -> f32 {
        self.window.delta_time()
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.renderer.view_matrix()
    }

    pub fn set_keys_down_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&[KeyCode], &mut Renderer, f32) + 'static,
    {
        self.keys_down_handler = Some(Box::new(handler));
    }

    /// Runs frames until the window requests a stop and returns the number
    /// of frames rendered.
    ///
    /// Each frame: window events, the keys-down handler, then
    /// `prepare_to_render_frame`, `frame(renderer, dt)` and
    /// `finish_frame_rendering`. An error from `frame` ends the loop.
    pub fn run<F>(&mut self, mut frame: F) -> GfxResult<u64>
    where
        F: FnMut(&mut Renderer, f32) -> GfxResult<()>,
    {
        let (width, height) = self.window.size();
        log::info!("running '{}' at {}x{}", self.window.title(), width, height);

        self.renderer.prepare_for_rendering();

        let mut frames = 0;
        while !self.window.process_events() {
            let dt = self.window.delta_time();

            if let Some(handler) = self.keys_down_handler.as_mut() {
                let keys = self.window.keys_down();
                if !keys.is_empty() {
                    handler(&keys, &mut self.renderer, dt);
                }
            }

            self.renderer.prepare_to_render_frame();
            if let Err(error) = frame(&mut self.renderer, dt) {
                log::error!("frame {} failed: {}", frames, error);
                return Err(error);
            }
            let stats = self.renderer.finish_frame_rendering();
            log::trace!("frame {}: {} draw calls", stats.frame, stats.draw_calls);
            frames += 1;
        }

        log::info!("stopped after {} frames", frames);
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::device::PrimitiveTopology;
    use crate::gfx::geometry::generate_rectangle_surface;
    use crate::gfx::transform::MatrixMode;
    use cgmath::{SquareMatrix, Vector3};
    use std::cell::Cell;

    fn config(frames: u64) -> AppConfig {
        AppConfig::default()
            .with_title("test")
            .with_size(320, 240)
            .with_frame_budget(Some(frames))
    }

    #[test]
    fn test_frame_budget_stops_loop() {
        let mut app = TartanApp::headless(config(5));
        let frames = app.run(|_, _| Ok(())).unwrap();

        assert_eq!(frames, 5);
        assert_eq!(app.window().frame(), 5);
        assert_eq!(app.renderer().frame_stats().frame, 4);
    }

    #[test]
    fn test_escape_stops_loop() {
        let mut app = TartanApp::headless(config(100));
        *app.window_mut() = HeadlessWindow::new(&config(100)).with_key_press(3, KeyCode::Escape);

        assert_eq!(app.run(|_, _| Ok(())).unwrap(), 3);
    }

    #[test]
    fn test_scripted_keys_reach_handler() {
        let mut app = TartanApp::headless(config(6).with_delta_time(0.5));
        *app.window_mut() = HeadlessWindow::new(&config(6).with_delta_time(0.5))
            .with_key_press(1, KeyCode::KeyW)
            .with_key_release(3, KeyCode::KeyW);

        app.set_keys_down_handler(|keys, renderer, dt| {
            if keys.contains(&KeyCode::KeyW) {
                let stack = renderer.matrix_stack_mut();
                stack.set_mode(MatrixMode::View);
                stack.translate(Vector3::new(0.0, 0.0, dt));
            }
        });
        app.run(|_, _| Ok(())).unwrap();

        // Held during frames 1 and 2.
        let expected = Matrix4::from_translation(Vector3::new(0.0, 0.0, 1.0));
        crate::gfx::transform::assert_matrix_near(app.view_matrix(), expected);
        assert!(!app.window().is_key_down(KeyCode::KeyW));
        assert_eq!(app.get_dt(), 0.5);
    }

    #[test]
    fn test_frames_draw_through_renderer() {
        let mut app = TartanApp::headless(config(3));
        let renderer = app.renderer_mut();
        let material = renderer.create_standard_material();
        let surface = renderer.create_geometry_from_data(
            PrimitiveTopology::Triangles,
            &generate_rectangle_surface(1.0, 1.0, 2, 2),
        );

        let draws = Cell::new(0);
        app.run(|renderer, _| {
            renderer.set_material_current(Some(material));
            renderer.set_geometry_current(Some(surface));
            renderer.render_current_geometry()?;
            draws.set(draws.get() + renderer.frame_stats().draw_calls);
            Ok(())
        })
        .unwrap();

        assert_eq!(draws.get(), 3);
        assert_eq!(app.view_matrix(), Matrix4::identity());
    }

    #[cfg(not(any(target_family = "wasm", target_os = "ios")))]
    #[test]
    fn test_winit_key_state_tracks_presses() {
        let mut state = WinitState {
            title: "test".to_string(),
            size: (320, 240),
            window: None,
            pressed: HashSet::new(),
            exit_requested: false,
            last_frame: Instant::now(),
            delta_time: 0.0,
        };

        state.key_input(KeyCode::KeyW, ElementState::Pressed);
        state.key_input(KeyCode::KeyA, ElementState::Pressed);
        state.key_input(KeyCode::KeyW, ElementState::Released);
        assert_eq!(state.pressed.iter().copied().collect::<Vec<_>>(), vec![KeyCode::KeyA]);
        assert!(!state.exit_requested);

        state.key_input(KeyCode::Escape, ElementState::Pressed);
        assert!(state.exit_requested);
    }

    #[test]
    fn test_frame_error_ends_loop() {
        let mut app = TartanApp::headless(config(10));
        let result = app.run(|renderer, _| renderer.render_current_geometry());

        assert!(matches!(result, Err(GfxError::NothingBound("material"))));
        assert_eq!(app.window().frame(), 1);
    }
}
