//! Bubble Pop entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, HtmlInputElement, MouseEvent, TouchEvent};

    use bubble_pop::audio::AudioManager;
    use bubble_pop::renderer::SdfRenderState;
    use bubble_pop::settings::{volume_from_percent, volume_to_percent};
    use bubble_pop::sim::{Arena, FrameClock, GameEvent, GameState, tick};
    use bubble_pop::{Settings, Tuning, TuningError};

    /// Game instance holding all state
    struct Game {
        state: GameState,
        render_state: Option<SdfRenderState>,
        clock: FrameClock,
        audio: AudioManager,
        settings: Settings,
        canvas: HtmlCanvasElement,
        dpr: f64,
        shown_score: Option<u64>,
    }

    impl Game {
        fn new(
            seed: u64,
            tuning: Tuning,
            canvas: HtmlCanvasElement,
        ) -> Result<Self, TuningError> {
            let settings = Settings::load();
            let mut audio = AudioManager::new();
            audio.apply_settings(&settings);

            Ok(Self {
                state: GameState::new(seed, tuning, Arena::new(0.0, 0.0))?,
                render_state: None,
                clock: FrameClock::new(),
                audio,
                settings,
                canvas,
                dpr: 1.0,
                shown_score: None,
            })
        }

        /// Match the canvas backing store to the window; returns physical size
        fn fit_canvas(&mut self) -> (u32, u32) {
            let Some(window) = web_sys::window() else {
                return (1, 1);
            };
            let css_w = window
                .inner_width()
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            let css_h = window
                .inner_height()
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            self.dpr = window.device_pixel_ratio();

            let width = ((css_w * self.dpr) as u32).max(1);
            let height = ((css_h * self.dpr) as u32).max(1);
            self.canvas.set_width(width);
            self.canvas.set_height(height);

            self.state.resize(css_w as f32, css_h as f32);
            if let Some(render_state) = self.render_state.as_mut() {
                render_state.resize(width, height, self.dpr as f32);
            }
            (width, height)
        }

        /// One display frame. Returns false once the loop should end.
        fn frame(&mut self, time: f64) -> bool {
            let elapsed = self.clock.advance(time);
            let report = tick(&mut self.state, elapsed);

            self.handle_events();
            self.audio.update_music();
            self.render(time);
            self.update_hud();

            report.keep_running
        }

        /// Pointer press in canvas CSS pixels
        fn press(&mut self, x: f32, y: f32) {
            // First gesture unlocks audio
            self.audio.resume();
            if self.state.pop_at(Vec2::new(x, y)).is_some() {
                self.handle_events();
                self.update_hud();
            }
        }

        fn handle_events(&mut self) {
            for event in self.state.drain_events() {
                match event {
                    GameEvent::Popped { category, .. } => {
                        self.audio.play(category.sound());
                    }
                    GameEvent::LevelUp(level) => {
                        log::info!(
                            "Level {}: bubbles x{:.1}, spawning every {}ms",
                            level.threshold_index,
                            level.speed_multiplier,
                            level.spawn_interval_ms
                        );
                    }
                    GameEvent::Spawned { .. } | GameEvent::Expired { .. } => {}
                }
            }
        }

        /// Render the current frame
        fn render(&mut self, time: f64) {
            if let Some(ref mut render_state) = self.render_state {
                match render_state.render(&self.state, time) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        let (w, h) = render_state.size;
                        render_state.resize(w, h, self.dpr as f32);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory!");
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
        }

        /// Update HUD elements in DOM
        fn update_hud(&mut self) {
            let score = self.state.score();
            if self.shown_score == Some(score) {
                return;
            }
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            if let Some(el) = document.get_element_by_id("score") {
                el.set_text_content(Some(&score.to_string()));
                self.shown_score = Some(score);
            }
        }

        fn auto_pause(&mut self, reason: &str) {
            if self.settings.mute_on_blur && self.state.is_running() {
                self.state.pause();
                self.audio.set_muted(true);
                log::info!("Auto-paused ({})", reason);
            }
        }

        fn auto_resume(&mut self) {
            if self.state.phase == bubble_pop::sim::GamePhase::Paused {
                self.state.resume();
                // Don't replay the hidden time as one huge frame
                self.clock.reset();
                self.audio.set_muted(false);
                log::info!("Resumed");
            }
        }

        fn update_settings(&mut self, f: impl FnOnce(&mut Settings)) {
            f(&mut self.settings);
            self.settings.save();
            self.audio.apply_settings(&self.settings);
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Bubble Pop starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("bubble-canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");

        let tuning = match Tuning::from_json(include_str!("../assets/tuning.json")) {
            Ok(tuning) => tuning,
            Err(e) => {
                log::error!("Invalid tuning: {}", e);
                return;
            }
        };

        // Initialize game
        let seed = js_sys::Date::now() as u64;
        let game = match Game::new(seed, tuning, canvas.clone()) {
            Ok(game) => Rc::new(RefCell::new(game)),
            Err(e) => {
                log::error!("Failed to start game: {}", e);
                return;
            }
        };
        let (width, height) = game.borrow_mut().fit_canvas();
        log::info!("Game initialized with seed: {}", seed);

        // Initialize WebGPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .expect("Failed to create surface");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("Failed to get adapter");

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let dpr = window.device_pixel_ratio() as f32;
        match SdfRenderState::new(surface, &adapter, width, height, dpr).await {
            Ok(mut render_state) => {
                render_state.set_start_time(js_sys::Date::now());
                game.borrow_mut().render_state = Some(render_state);
            }
            Err(e) => {
                log::error!("Renderer unavailable: {}", e);
                return;
            }
        }

        setup_input_handlers(&canvas, game.clone());
        setup_resize(game.clone());
        setup_settings_panel(game.clone());
        setup_auto_pause(game.clone());

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.class_list().add_1("hidden");
        }

        // Start game loop
        request_animation_frame(game);

        log::info!("Bubble Pop running!");
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Mouse press
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                game.borrow_mut()
                    .press(event.offset_x() as f32, event.offset_y() as f32);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch start, first touch only
        {
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let rect = canvas_clone.get_bounding_client_rect();
                    let x = touch.client_x() as f32 - rect.left() as f32;
                    let y = touch.client_y() as f32 - rect.top() as f32;
                    game.borrow_mut().press(x, y);
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let (w, h) = game.borrow_mut().fit_canvas();
            log::debug!("Canvas resized to {}x{}", w, h);
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_settings_panel(game: Rc<RefCell<Game>>) {
        let document = web_sys::window().unwrap().document().unwrap();

        // Open/close buttons both toggle the panel
        for id in ["settings-btn", "close-settings"] {
            if let Some(btn) = document.get_element_by_id(id) {
                let document = document.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                    if let Some(panel) = document.get_element_by_id("settings-panel") {
                        let _ = panel.class_list().toggle("hidden");
                    }
                });
                let _ =
                    btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }

        let toggles: [(&str, fn(&Settings) -> bool, fn(&mut Settings, bool)); 3] = [
            ("sound-toggle", |s| s.sound_enabled, |s, on| s.sound_enabled = on),
            ("music-toggle", |s| s.music_enabled, |s, on| s.music_enabled = on),
            ("mute-on-blur-toggle", |s| s.mute_on_blur, |s, on| s.mute_on_blur = on),
        ];
        for (id, get, set) in toggles {
            let Some(input) = document
                .get_element_by_id(id)
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            else {
                continue;
            };
            input.set_checked(get(&game.borrow().settings));

            let game = game.clone();
            let input_clone = input.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let on = input_clone.checked();
                let mut g = game.borrow_mut();
                g.audio.resume();
                g.update_settings(|s| set(s, on));
                log::info!("{} -> {}", id, on);
            });
            let _ = input.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Volume sliders (range inputs, 0-100)
        let sliders: [(&str, fn(&Settings) -> f32, fn(&mut Settings, f32)); 3] = [
            ("master-volume", |s| s.master_volume, |s, v| s.master_volume = v),
            ("sfx-volume", |s| s.sfx_volume, |s, v| s.sfx_volume = v),
            ("music-volume", |s| s.music_volume, |s, v| s.music_volume = v),
        ];
        for (id, get, set) in sliders {
            let Some(input) = document
                .get_element_by_id(id)
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            else {
                continue;
            };
            input.set_value(&volume_to_percent(get(&game.borrow().settings)));

            let game = game.clone();
            let input_clone = input.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let Some(volume) = volume_from_percent(&input_clone.value()) else {
                    return;
                };
                game.borrow_mut().update_settings(|s| set(s, volume));
                log::debug!("{} -> {:.2}", id, volume);
            });
            let _ = input.add_event_listener_with_callback("input", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let document = window.document().unwrap();

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let mut g = game.borrow_mut();
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    g.auto_pause("tab hidden");
                } else {
                    g.auto_resume();
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur (click outside)
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                game.borrow_mut().auto_pause("window blur");
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Focus regained
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                game.borrow_mut().auto_resume();
            });
            let _ =
                window.add_event_listener_with_callback("focus", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        let keep_running = game.borrow_mut().frame(time);
        if keep_running {
            request_animation_frame(game);
        } else {
            log::info!("Game loop stopped");
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Bubble Pop (native) starting...");
    log::info!("Native mode is headless - run with `trunk serve` for the web version");

    let tuning_path = std::env::args().nth(1);
    let tuning = match load_tuning(tuning_path.as_deref()) {
        Ok(tuning) => tuning,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = autoplay(tuning, 60.0) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Bundled tuning, or a JSON file given on the command line
#[cfg(not(target_arch = "wasm32"))]
fn load_tuning(path: Option<&str>) -> Result<bubble_pop::Tuning, String> {
    use bubble_pop::Tuning;

    let Some(path) = path else {
        return Tuning::from_json(include_str!("../assets/tuning.json")).map_err(|e| e.to_string());
    };
    let json = std::fs::read_to_string(path).map_err(|e| format!("reading {}: {}", path, e))?;
    Tuning::from_json(&json).map_err(|e| format!("{}: {}", path, e))
}

/// Headless demo: a player who taps the newest bubble a few times a second
#[cfg(not(target_arch = "wasm32"))]
fn autoplay(tuning: bubble_pop::Tuning, seconds: f64) -> Result<(), bubble_pop::TuningError> {
    use bubble_pop::consts::{DEFAULT_ARENA_HEIGHT, DEFAULT_ARENA_WIDTH};
    use bubble_pop::sim::{Arena, FrameClock, GameEvent, GameState, tick};

    const FRAME_MS: f64 = 1000.0 / 60.0;
    const FRAMES_PER_TAP: u64 = 20;

    let seed = 0xB0BB1E;
    let mut state = GameState::new(
        seed,
        tuning,
        Arena::new(DEFAULT_ARENA_WIDTH, DEFAULT_ARENA_HEIGHT),
    )?;
    let mut clock = FrameClock::new();

    let (mut spawned, mut popped, mut missed) = (0u32, 0u32, 0u32);
    let frames = (seconds * 1000.0 / FRAME_MS) as u64;
    for frame in 0..frames {
        tick(&mut state, clock.advance(frame as f64 * FRAME_MS));

        if frame % FRAMES_PER_TAP == 0 {
            if let Some(target) = state.bubbles.last().map(|b| b.pos) {
                state.pop_at(target);
            }
        }

        for event in state.drain_events() {
            match event {
                GameEvent::Spawned { .. } => spawned += 1,
                GameEvent::Popped { .. } => popped += 1,
                GameEvent::Expired { .. } => missed += 1,
                GameEvent::LevelUp(level) => log::info!(
                    "t={:.1}s level {} (speed x{:.1})",
                    state.time_ms / 1000.0,
                    level.threshold_index,
                    level.speed_multiplier
                ),
            }
        }
    }

    println!(
        "{:.0}s autoplay (seed {:#x}): score {}, {} spawned, {} popped, {} floated away, {} on screen",
        seconds,
        seed,
        state.score(),
        spawned,
        popped,
        missed,
        state.bubbles.len()
    );
    Ok(())
}
