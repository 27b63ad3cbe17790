//! oled-tiles frontend.
//!
//! Provides three execution modes:
//!
//! - **demo** (default): Powers the panel on, lays out seven tiles, prints
//!   the digits 0–6 (tile 4 in the tall font) and flushes once.
//! - **listen**: Binds a UDP port and renders incoming bus frames into a
//!   virtual panel (desktop window with the `window` feature, terminal otherwise).
//! - **replay FILE**: Replays a capture file into a virtual panel.
//!
//! Every mode accepts `--capture FILE` / `--png FILE` to keep what was sent
//! and what the panel ended up showing.

use oled_tiles_core::capture::{self, Capture};
use oled_tiles_core::transport::{ChunkedSink, LogSink, NullSink, Record, Recorder, UdpSink};
use oled_tiles_core::{
    png, Controller, Error, Font, Geometry, Layout, PanelConfig, Point, Transport, VirtualPanel,
    DEFAULT_UDP_PORT, MAX_DATAGRAM,
};
use std::env;
use std::net::{SocketAddr, UdpSocket};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "window")]
use minifb::{Key, Scale, ScaleMode, Window, WindowOptions};

/// Tile rectangles of the demo screen: two status lines with a narrow
/// separator column and a right-hand field each, plus a two-page line below.
const DEMO_TILES: [((u8, u8), (u8, u8)); 7] = [
    ((0, 0), (0, 95)),
    ((1, 0), (1, 95)),
    ((0, 104), (0, 127)),
    ((1, 104), (1, 127)),
    ((2, 0), (3, 127)),
    ((0, 96), (0, 103)),
    ((1, 96), (1, 103)),
];
const TALL_TILE: usize = 4;

#[cfg(feature = "window")]
const WINDOW_SCALE: usize = 4;

fn usage(program: &str) -> ! {
    eprintln!("oled-tiles v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Usage: {} [demo|listen|replay FILE] [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --sink log|udp|panel  demo: where bus writes go (default log)");
    eprintln!("  --target ADDR         demo: UDP target (default 127.0.0.1:{})", DEFAULT_UDP_PORT);
    eprintln!("  --port N              listen: UDP port (default {})", DEFAULT_UDP_PORT);
    eprintln!("  --count N             listen: stop after N frames");
    eprintln!("  --capture FILE        Save every bus write to a capture file");
    eprintln!("  --png FILE            Save the final panel image");
    eprintln!("  --debug               Verbose logging (overrides RUST_LOG)");
    std::process::exit(1);
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn option_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage(&args[0]);
    }
    init_logging(args.iter().any(|a| a == "--debug"));

    let mode = args.get(1).filter(|a| !a.starts_with("--")).map(String::as_str).unwrap_or("demo");
    let result = match mode {
        "demo" => run_demo(&args),
        "listen" => run_listen(&args),
        "replay" => match args.get(2) {
            Some(path) => run_replay(&args, path),
            None => usage(&args[0]),
        },
        _ => usage(&args[0]),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

// ─── demo ───────────────────────────────────────────────────────────────────

fn open_sink(args: &[String]) -> Result<Box<dyn Transport>, String> {
    match option_value(args, "--sink").unwrap_or("log") {
        "log" => Ok(Box::new(LogSink::default())),
        "udp" => {
            let sink = match option_value(args, "--target") {
                Some(t) => UdpSink::new(t.parse::<SocketAddr>()
                    .map_err(|e| format!("Bad --target {}: {}", t, e))?),
                None => UdpSink::default(),
            };
            Ok(Box::new(sink))
        }
        "panel" => Ok(Box::new(NullSink)),
        other => Err(format!("Unknown sink '{}' (expected log, udp or panel)", other)),
    }
}

fn draw_demo<T: Transport>(layout: &mut Layout<T>) -> Result<usize, Error> {
    for &((sp, sc), (ep, ec)) in &DEMO_TILES {
        layout.add_tile(Point::new(sp, sc), Point::new(ep, ec))?;
    }
    for (handle, digit) in (b'0'..).take(DEMO_TILES.len()).enumerate() {
        let font = if handle == TALL_TILE { Font::Tall } else { Font::Narrow };
        layout.print(handle, &[digit], font)?;
    }
    layout.flush()
}

fn run_demo(args: &[String]) -> Result<(), String> {
    let geometry = Geometry::default();
    let mut transport = Recorder::new(ChunkedSink::new(open_sink(args)?));
    transport.init().map_err(|e| format!("Transport init: {}", e))?;

    let mut controller = Controller::new(transport);
    controller.init_display(&PanelConfig::default())
        .map_err(|e| format!("Panel init: {}", e))?;

    let mut layout = Layout::new(geometry, controller);
    let drawn = draw_demo(&mut layout);

    let mut transport = layout.into_controller().into_transport();
    let records = transport.take_records();
    if let Err(e) = transport.close() {
        tracing::warn!("transport close: {}", e);
    }
    let flushed = drawn.map_err(|e| format!("Demo: {}", e))?;
    tracing::info!("flushed {} tiles in {} bus writes", flushed, records.len());

    let session = Capture::new(geometry, records);
    if option_value(args, "--sink") == Some("panel") {
        print!("{}", session.replay().to_ascii());
    }
    finish(args, &session, None)
}

// ─── listen ─────────────────────────────────────────────────────────────────

/// Feed one UDP frame into the panel, keeping a copy for captures.
fn accept_frame(frame: &[u8], panel: &mut VirtualPanel, log: &mut Vec<Record>) {
    match capture::decode_datagram(frame) {
        Some((address, kind, payload)) => {
            tracing::debug!("{} bytes of {} for 0x{:02X}", payload.len(), kind.label(), address);
            // The virtual panel accepts every write
            let _ = panel.send(kind, address, payload);
            log.push(Record { kind, address, payload: payload.to_vec() });
        }
        None => tracing::warn!("dropping malformed frame ({} bytes)", frame.len()),
    }
}

fn run_listen(args: &[String]) -> Result<(), String> {
    let port: u16 = option_value(args, "--port")
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_UDP_PORT);
    let count: Option<usize> = option_value(args, "--count").and_then(|s| s.parse().ok());

    let socket = UdpSocket::bind(("127.0.0.1", port))
        .map_err(|e| format!("Bind port {}: {}", port, e))?;
    tracing::info!("listening on {}", socket.local_addr().map_err(|e| e.to_string())?);

    let geometry = Geometry::default();
    let mut panel = VirtualPanel::new(geometry);
    let mut log = Vec::new();
    receive_loop(&socket, &mut panel, &mut log, count)?;

    let session = Capture::new(geometry, log);
    finish(args, &session, Some(&panel))
}

#[cfg(not(feature = "window"))]
fn receive_loop(
    socket: &UdpSocket,
    panel: &mut VirtualPanel,
    log: &mut Vec<Record>,
    count: Option<usize>,
) -> Result<(), String> {
    let mut buf = [0u8; MAX_DATAGRAM];
    let mut frames = 0usize;
    while count.map_or(true, |n| frames < n) {
        let len = socket.recv(&mut buf).map_err(|e| format!("Receive: {}", e))?;
        frames += 1;
        accept_frame(&buf[..len], panel, log);
        if panel.dirty {
            panel.dirty = false;
            // Home the cursor and redraw in place
            print!("\x1b[H\x1b[2J{}", panel.to_ascii());
        }
    }
    Ok(())
}

#[cfg(feature = "window")]
fn receive_loop(
    socket: &UdpSocket,
    panel: &mut VirtualPanel,
    log: &mut Vec<Record>,
    count: Option<usize>,
) -> Result<(), String> {
    socket.set_nonblocking(true).map_err(|e| format!("Socket: {}", e))?;
    let mut window = open_window(panel.geometry(), "oled-tiles listen")?;
    let mut buf = [0u8; MAX_DATAGRAM];
    let mut frames = 0usize;
    while window.is_open() && !window.is_key_down(Key::Escape) {
        loop {
            match socket.recv(&mut buf) {
                Ok(len) => {
                    frames += 1;
                    accept_frame(&buf[..len], panel, log);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(format!("Receive: {}", e)),
            }
        }
        present(&mut window, panel)?;
        if count.map_or(false, |n| frames >= n) {
            break;
        }
    }
    Ok(())
}

// ─── replay ─────────────────────────────────────────────────────────────────

fn run_replay(args: &[String], path: &str) -> Result<(), String> {
    let session = capture::load_from_file(Path::new(path))?;
    tracing::info!("{}: {} records, {} data bytes", path, session.records.len(), session.data_bytes());
    let panel = session.replay();

    #[cfg(feature = "window")]
    {
        let mut window = open_window(panel.geometry(), "oled-tiles replay")?;
        while window.is_open() && !window.is_key_down(Key::Escape) {
            present(&mut window, &panel)?;
        }
    }
    #[cfg(not(feature = "window"))]
    print!("{}", panel.to_ascii());

    finish(args, &session, Some(&panel))
}

// ─── shared ─────────────────────────────────────────────────────────────────

/// Write the optional capture and PNG outputs.
fn finish(args: &[String], session: &Capture, panel: Option<&VirtualPanel>) -> Result<(), String> {
    if let Some(path) = option_value(args, "--capture") {
        capture::save_to_file(session, Path::new(path))?;
        tracing::info!("capture: {} ({} records)", path, session.records.len());
    }
    if let Some(path) = option_value(args, "--png") {
        let replayed;
        let panel = match panel {
            Some(p) => p,
            None => {
                replayed = session.replay();
                &replayed
            }
        };
        png::save_panel(panel, Path::new(path))?;
        tracing::info!("png: {}", path);
    }
    Ok(())
}

#[cfg(feature = "window")]
fn open_window(geometry: Geometry, title: &str) -> Result<Window, String> {
    let mut window = Window::new(
        title,
        geometry.columns() as usize * WINDOW_SCALE,
        geometry.rows() * WINDOW_SCALE,
        WindowOptions {
            scale: Scale::X1,
            scale_mode: ScaleMode::AspectRatioStretch,
            resize: true,
            ..Default::default()
        },
    ).map_err(|e| format!("Window: {}", e))?;
    window.set_target_fps(60);
    Ok(window)
}

#[cfg(feature = "window")]
fn present(window: &mut Window, panel: &VirtualPanel) -> Result<(), String> {
    let g = panel.geometry();
    let (w, h) = (g.columns() as usize, g.rows());
    let (sw, sh) = (w * WINDOW_SCALE, h * WINDOW_SCALE);
    let pixels = panel.as_pixel_buffer();
    let mut scaled = vec![0u32; sw * sh];
    for y in 0..h {
        for x in 0..w {
            let c = pixels[y * w + x];
            for sy in 0..WINDOW_SCALE {
                let base = (y * WINDOW_SCALE + sy) * sw + x * WINDOW_SCALE;
                scaled[base..base + WINDOW_SCALE].fill(c);
            }
        }
    }
    window.update_with_buffer(&scaled, sw, sh).map_err(|e| format!("Window: {}", e))
}
