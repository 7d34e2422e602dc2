//! Commodore 64 emulator binary.
//!
//! Runs the C64 in a winit window with a pixels framebuffer, or in
//! headless mode for screenshots. On an execution fault the emulator
//! stops, prints the diagnostic, and the window keeps the last painted
//! frame.

#![allow(clippy::cast_possible_truncation)]

use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use emu64_c64::{capture, keyboard_map, C64, C64Config};
use log::error;
use pixels::{Pixels, SurfaceTexture};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

/// Frame buffer dimensions.
const FB_WIDTH: u32 = emu64_c64::vic::FB_WIDTH as u32;
const FB_HEIGHT: u32 = emu64_c64::vic::FB_HEIGHT as u32;

/// Window scale factor: the window is twice the visible frame.
const SCALE: u32 = 2;

/// Repaint cadence for the ~50 Hz PAL display.
const FRAME_DURATION: Duration = Duration::from_millis(20);

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    prg_path: Option<PathBuf>,
    roms_dir: Option<PathBuf>,
    headless: bool,
    frames: u32,
    screenshot_path: Option<PathBuf>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        prg_path: None,
        roms_dir: None,
        headless: false,
        frames: 200,
        screenshot_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--prg" => {
                i += 1;
                cli.prg_path = args.get(i).map(PathBuf::from);
            }
            "--roms" => {
                i += 1;
                cli.roms_dir = args.get(i).map(PathBuf::from);
            }
            "--headless" => {
                cli.headless = true;
            }
            "--frames" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.frames = s.parse().unwrap_or(200);
                }
            }
            "--screenshot" => {
                i += 1;
                cli.screenshot_path = args.get(i).map(PathBuf::from);
            }
            "--help" | "-h" => {
                eprintln!("Usage: c64 [OPTIONS]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --prg <file>         Load a PRG file into memory");
                eprintln!("  --roms <dir>         ROM directory [default: ./roms]");
                eprintln!("  --headless           Run without a window");
                eprintln!("  --frames <n>         Frames to run in headless mode [default: 200]");
                eprintln!("  --screenshot <file>  Save a PNG screenshot (headless)");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

// ---------------------------------------------------------------------------
// Headless mode
// ---------------------------------------------------------------------------

fn run_headless(cli: &CliArgs) {
    let mut c64 = make_c64(cli);

    for _ in 0..cli.frames {
        if let Err(e) = c64.run_frame() {
            error!("{e}");
            break;
        }
    }

    if let Some(ref path) = cli.screenshot_path {
        if let Err(e) = capture::save_screenshot(&c64, path) {
            eprintln!("Screenshot error: {e}");
            process::exit(1);
        }
        eprintln!("Screenshot saved to {}", path.display());
    }
}

// ---------------------------------------------------------------------------
// Windowed mode (winit + pixels)
// ---------------------------------------------------------------------------

struct App {
    c64: C64,
    window: Option<&'static Window>,
    pixels: Option<Pixels<'static>>,
    last_frame_time: Instant,
    /// Set after an execution fault; the last frame stays on screen.
    halted: bool,
}

impl App {
    fn new(c64: C64) -> Self {
        Self {
            c64,
            window: None,
            pixels: None,
            last_frame_time: Instant::now(),
            halted: false,
        }
    }

    fn handle_key(&mut self, keycode: KeyCode, pressed: bool) {
        // Cursor up/left are SHIFT combinations on the C64
        let combo = match keycode {
            KeyCode::ArrowUp => Some(keyboard_map::cursor_up_keys()),
            KeyCode::ArrowLeft => Some(keyboard_map::cursor_left_keys()),
            _ => None,
        };
        if let Some(keys) = combo {
            for key in keys {
                if pressed {
                    self.c64.press_key(key);
                } else {
                    self.c64.release_key(key);
                }
            }
            return;
        }

        if let Some(key) = keyboard_map::map_keycode(keycode) {
            if pressed {
                self.c64.press_key(key);
            } else {
                self.c64.release_key(key);
            }
        }
    }

    fn update_pixels(&mut self) {
        let Some(pixels) = self.pixels.as_mut() else {
            return;
        };

        // RGB frame buffer → RGBA surface
        let fb = self.c64.framebuffer();
        let frame = pixels.frame_mut();
        for (dst, src) in frame.chunks_exact_mut(4).zip(fb.chunks_exact(3)) {
            dst[0] = src[0];
            dst[1] = src[1];
            dst[2] = src[2];
            dst[3] = 0xFF;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_size = winit::dpi::LogicalSize::new(FB_WIDTH * SCALE, FB_HEIGHT * SCALE);
        let attrs = WindowAttributes::default()
            .with_title("Commodore 64")
            .with_inner_size(window_size)
            .with_resizable(false);

        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window: &'static Window = Box::leak(Box::new(window));
                let inner = window.inner_size();
                let surface = SurfaceTexture::new(inner.width, inner.height, window);
                match Pixels::new(FB_WIDTH, FB_HEIGHT, surface) {
                    Ok(pixels) => {
                        self.pixels = Some(pixels);
                    }
                    Err(e) => {
                        eprintln!("Failed to create pixels: {e}");
                        event_loop.exit();
                        return;
                    }
                }
                self.window = Some(window);
            }
            Err(e) => {
                eprintln!("Failed to create window: {e}");
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
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    if keycode == KeyCode::Escape && event.state == ElementState::Pressed {
                        event_loop.exit();
                        return;
                    }
                    self.handle_key(keycode, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                if !self.halted && now.duration_since(self.last_frame_time) >= FRAME_DURATION {
                    match self.c64.run_frame() {
                        Ok(_) => self.update_pixels(),
                        Err(e) => {
                            // Fatal: stop stepping, keep the last frame
                            error!("{e}");
                            self.halted = true;
                        }
                    }
                    self.last_frame_time = now;
                }

                if let Some(pixels) = self.pixels.as_ref() {
                    if let Err(e) = pixels.render() {
                        eprintln!("Render error: {e}");
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window {
            window.request_redraw();
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Find the roms/ directory relative to the executable or current
/// directory.
fn find_roms_dir() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let mut dir = exe.parent().map(Path::to_path_buf);
        for _ in 0..5 {
            if let Some(ref d) = dir {
                let roms = d.join("roms");
                if roms.is_dir() {
                    return roms;
                }
                dir = d.parent().map(Path::to_path_buf);
            }
        }
    }
    PathBuf::from("roms")
}

fn make_c64(cli: &CliArgs) -> C64 {
    let roms_dir = cli.roms_dir.clone().unwrap_or_else(find_roms_dir);
    let config = match C64Config::from_rom_dir(&roms_dir) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            eprintln!();
            eprintln!("Place C64 ROM files in the roms/ directory:");
            eprintln!("  roms/kernal.rom  (8192 bytes)");
            eprintln!("  roms/basic.rom   (8192 bytes)");
            eprintln!("  roms/chargen.rom (4096 bytes)");
            process::exit(1);
        }
    };

    let mut c64 = match C64::new(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if let Some(ref path) = cli.prg_path {
        let data = match std::fs::read(path) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Failed to read PRG file {}: {e}", path.display());
                process::exit(1);
            }
        };
        match c64.load_prg(&data) {
            Ok(addr) => eprintln!("Loaded PRG at ${addr:04X}: {}", path.display()),
            Err(e) => {
                eprintln!("Failed to load PRG: {e}");
                process::exit(1);
            }
        }
    }

    c64
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    let cli = parse_args();

    if cli.headless {
        run_headless(&cli);
        return;
    }

    let c64 = make_c64(&cli);
    let mut app = App::new(c64);

    let event_loop = match EventLoop::new() {
        Ok(el) => el,
        Err(e) => {
            eprintln!("Failed to create event loop: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = event_loop.run_app(&mut app) {
        eprintln!("Event loop error: {e}");
        process::exit(1);
    }
}
