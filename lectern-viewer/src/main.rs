mod runtime;
mod session;

use std::io::BufRead;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use lectern_bridge::deck::DeckLayout;
use lectern_bridge::protocol::FrameId;
use lectern_bridge::server::DeckServer;
use lectern_bridge::viewer::ViewerEndpoint;
use lectern_core::config::Config;
use lectern_core::options::ViewerOptions;
use lectern_types::Size;

use runtime::{LogSink, ViewerRuntime};
use session::ViewerSession;

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("lectern")
        .join("lectern.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::File::create(&log_path)
        .unwrap_or_else(|_| std::fs::File::create("/tmp/lectern.log").expect("Cannot create log file"));

    WriteLogger::init(log_level, simplelog::Config::default(), log_file)
        .expect("Failed to initialize logger");

    log::info!("lectern starting (log level: {:?})", log_level);
}

fn usage() -> ! {
    eprintln!("Usage: lectern [--connect ADDR] [--slide N] [-v] 'score=PATH&zoom=fit&...'");
    eprintln!("       lectern --deck ADDR [-v]");
    std::process::exit(2);
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");

    let deck_addr = args
        .iter()
        .position(|a| a == "--deck")
        .and_then(|i| args.get(i + 1).cloned());
    if let Some(addr) = deck_addr {
        init_logging(verbose);
        return run_deck(&addr);
    }

    let connect_addr = args
        .iter()
        .position(|a| a == "--connect")
        .and_then(|i| args.get(i + 1).cloned());
    let slide_index: i32 = args
        .iter()
        .position(|a| a == "--slide")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    // The remaining positional argument is the embed query string.
    let mut query = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--connect" | "--slide" | "--deck" => i += 2,
            "-v" | "--verbose" => i += 1,
            other => {
                query = Some(other.to_string());
                i += 1;
            }
        }
    }
    let query = match query {
        Some(q) => q,
        None => usage(),
    };

    let options = match ViewerOptions::from_query(&query) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("lectern: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(verbose || options.debug);
    run_viewer(options, connect_addr.as_deref(), slide_index)
}

fn run_viewer(
    options: ViewerOptions,
    connect_addr: Option<&str>,
    slide_index: i32,
) -> std::io::Result<()> {
    let config = Config::load();

    let session = match ViewerSession::load(&options) {
        Ok(session) => session,
        Err(e) => {
            // Fatal load error: surfaced to the user, no retry.
            eprintln!("lectern: {}", e);
            std::process::exit(1);
        }
    };

    let endpoint = match connect_addr {
        Some(addr) => match ViewerEndpoint::connect(addr, slide_index) {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                eprintln!("lectern: cannot reach deck at {}: {}", addr, e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    if let Some(title) = &options.title {
        println!("{}", title);
    }

    let debug = options.debug;
    let mut viewer = ViewerRuntime::new(
        session,
        &options,
        &config,
        endpoint,
        Size::new(1024.0, 768.0),
        LogSink,
    );

    // Local debug controls come in on stdin: a bare number selects that
    // step, `0` clears, `q` quits.
    let stdin_rx = debug.then(spawn_stdin_reader);

    loop {
        viewer.tick(Instant::now());
        if viewer.is_closed() {
            log::info!("deck went away, exiting");
            break;
        }
        if let Some(rx) = &stdin_rx {
            match rx.try_recv() {
                Ok(line) => {
                    let line = line.trim();
                    if line == "q" {
                        break;
                    }
                    if let Ok(n) = line.parse::<i64>() {
                        viewer.select_step(n);
                    }
                }
                Err(mpsc::TryRecvError::Empty) => {}
                Err(mpsc::TryRecvError::Disconnected) => break,
            }
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    Ok(())
}

/// Deck layout that narrates resizes — the rehearsal stand-in for a real
/// presentation host.
struct LogLayout;

impl DeckLayout for LogLayout {
    fn set_frame_height(&mut self, frame: FrameId, height: f64) {
        log::info!("frame {:?} -> {:.0}px", frame, height);
    }

    fn refresh(&mut self) {
        log::debug!("deck layout refreshed");
    }
}

/// Rehearsal deck: accepts viewer connections and navigates from stdin
/// (one slide number per line).
fn run_deck(addr: &str) -> std::io::Result<()> {
    let config = Config::load();
    let mut server = DeckServer::bind(addr, config.resize_padding())?;
    let mut layout = LogLayout;

    println!("deck listening on {}", server.local_addr()?);
    println!("type a slide number to navigate, 'q' to quit");

    let stdin_rx = spawn_stdin_reader();

    loop {
        server.accept_connections();
        server.poll(&mut layout);
        match stdin_rx.try_recv() {
            Ok(line) => {
                let line = line.trim();
                if line == "q" {
                    break;
                }
                match line.parse::<i32>() {
                    Ok(slide) => {
                        server.navigate(slide);
                        println!("slide {}", slide);
                    }
                    Err(_) => println!("? {}", line),
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => break,
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    Ok(())
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}
