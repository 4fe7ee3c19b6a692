//! Audiotap CLI — play an audio file and watch its spectrum

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use audiotap::audio::EngineEvent;
use audiotap_app::data::Settings;
use audiotap_app::Session;

const BANDS: usize = 16;
const FRAME_INTERVAL: Duration = Duration::from_millis(50);
const BAR_GLYPHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Parser)]
#[command(name = "audiotap", about = "Play an audio file and show its spectrum", version)]
struct Cli {
    /// MP3, WAV or MP4 file to play
    file: PathBuf,

    /// Upload service base URL
    #[arg(long)]
    server: Option<String>,

    /// Skip the upload step
    #[arg(long)]
    no_upload: bool,

    /// Playback volume, 0.0 to 2.0
    #[arg(long)]
    volume: Option<f32>,

    /// Settings file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long)]
    seconds: Option<f64>,

    /// Write --server, --volume and --no-upload back to the settings file
    #[arg(long)]
    save: bool,
}

/// Average the byte spectrum into `BANDS` bars
fn bands(bins: &[u8]) -> [u8; BANDS] {
    let mut out = [0u8; BANDS];
    let width = (bins.len() / BANDS).max(1);
    for (band, chunk) in out.iter_mut().zip(bins.chunks(width)) {
        let sum: u32 = chunk.iter().map(|&b| b as u32).sum();
        *band = (sum / chunk.len() as u32) as u8;
    }
    out
}

fn render_bars(levels: &[u8; BANDS]) -> String {
    levels
        .iter()
        .map(|&l| BAR_GLYPHS[l as usize * (BAR_GLYPHS.len() - 1) / 255])
        .collect()
}

fn load_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    if let Some(server) = &cli.server {
        settings.server_url = server.clone();
    }
    if cli.no_upload {
        settings.upload_before_play = false;
    }
    if let Some(volume) = cli.volume {
        settings.set_volume(volume);
    }
    Ok(settings)
}

fn persist_settings(cli: &Cli, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.config {
        Some(path) => settings.save_to(path)?,
        None => settings.save()?,
    }
    info!(volume = settings.volume, server = %settings.server_url, "settings saved");
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(&cli)?;
    if cli.save {
        persist_settings(&cli, &settings)?;
    }
    info!(file = %cli.file.display(), upload = settings.upload_before_play, "opening");
    let mut session = Session::new(settings)?;

    let codec = session.open_file(&cli.file)?;
    eprintln!("{}", codec);

    let engine = session.engine_mut();
    engine.play()?;

    let limit = cli.seconds.map(Duration::from_secs_f64);
    let started = Instant::now();
    let mut stdout = io::stdout();

    'playback: loop {
        while let Some(event) = engine.try_recv_event() {
            if event == EngineEvent::Ended {
                break 'playback;
            }
        }
        if limit.is_some_and(|l| started.elapsed() >= l) {
            break;
        }
        if let Some(bins) = engine.sample() {
            write!(stdout, "\r[{}]", render_bars(&bands(&bins)))?;
            stdout.flush()?;
        }
        std::thread::sleep(FRAME_INTERVAL);
    }

    engine.stop()?;
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "playback finished");
    writeln!(stdout)?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
