//! Voice chatbot audio core CLI

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use voicebot::{
    wav, Config, ListenResult, Listener, PlaybackStreamer, PwCatBackend, PwCatPlayback,
    StopSignal, SynthesisChunk,
};

/// Voice chatbot audio core
#[derive(Parser)]
#[command(name = "voicebot")]
#[command(about = "Microphone capture with adaptive VAD and streaming playback", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Force a specific capture source (id or name)
    #[arg(long, env = "MIC_TARGET", global = true)]
    mic_target: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for one utterance and save it as a WAV file
    Listen {
        /// Output WAV file path
        #[arg(short, long, default_value = "utterance.wav")]
        output: PathBuf,

        /// Keep listening after timeouts until an utterance is captured
        #[arg(long)]
        wait: bool,
    },

    /// Record a few seconds and play them back (audio sanity check)
    Test {
        /// Recording duration in seconds
        #[arg(short, long, default_value = "3")]
        seconds: u32,

        /// Where to keep the test recording
        #[arg(short, long, default_value = "test.wav")]
        output: PathBuf,
    },

    /// Play a WAV file through the playback sink
    Play {
        /// Input WAV file path
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    let mut config = if let Some(ref config_path) = cli.config {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        Config::default()
    };

    if let Some(target) = cli.mic_target {
        info!("Using capture target: {}", target);
        config.capture.target = Some(target);
    }

    match cli.command {
        Commands::Listen { output, wait } => listen(config, output, wait),
        Commands::Test { seconds, output } => audio_test(config, seconds, output),
        Commands::Play { input } => play_file(config, input),
    }
}

/// Capture one VAD-bounded utterance and persist it.
fn listen(config: Config, output: PathBuf, wait: bool) -> Result<()> {
    let stop = StopSignal::new();
    stop.install_ctrlc()
        .context("Failed to install Ctrl+C handler")?;

    let listener = Listener::new(&config);
    let mut backend = PwCatBackend::new(&config.capture);

    loop {
        match listener.listen(&mut backend, &stop)? {
            ListenResult::Utterance(utterance) => {
                wav::save_wav(&utterance, &output)?;
                println!(
                    "Saved {:.1}s ({} Hz, {} ch) to {}",
                    utterance.duration_secs(),
                    utterance.sample_rate,
                    utterance.channels,
                    output.display()
                );
                return Ok(());
            }
            ListenResult::NoSpeech if wait && !stop.is_stopped() => {
                println!("No speech detected, still listening...");
            }
            ListenResult::NoSpeech => {
                println!("No speech detected");
                return Ok(());
            }
            ListenResult::Cancelled => {
                println!("Stopped");
                return Ok(());
            }
        }
    }
}

/// Record a fixed clip and play it back through the playback sink.
fn audio_test(config: Config, seconds: u32, output: PathBuf) -> Result<()> {
    let stop = StopSignal::new();
    stop.install_ctrlc()
        .context("Failed to install Ctrl+C handler")?;

    println!("Recording ~{}s for test...", seconds);
    let listener = Listener::new(&config);
    let mut backend = PwCatBackend::new(&config.capture);

    let Some(recording) = listener.record_fixed(&mut backend, &stop, seconds)? else {
        anyhow::bail!("No audio captured during test");
    };

    wav::save_wav(&recording, &output)?;
    println!(
        "Recorded {:.1}s at {} Hz, playing back...",
        recording.duration_secs(),
        recording.sample_rate
    );

    // Round-trip through the WAV so stereo captures get downmixed the
    // same way a diagnostic file would.
    play_file(config, output)?;
    println!("Audio test complete");
    Ok(())
}

/// Stream a WAV file's samples through the playback subprocess.
fn play_file(config: Config, input: PathBuf) -> Result<()> {
    let (samples, sample_rate) = wav::read_samples(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    info!(
        "Playing {} samples ({:.1}s) at {} Hz",
        samples.len(),
        samples.len() as f32 / sample_rate as f32,
        sample_rate
    );

    let mut streamer = PlaybackStreamer::new(PwCatPlayback::new(&config.playback));

    // Feed in moderate chunks to exercise the streaming path.
    let chunks = samples
        .chunks(4096)
        .map(|c| SynthesisChunk {
            samples: c.to_vec(),
            sample_rate,
        })
        .collect::<Vec<_>>();

    let report = streamer
        .play(chunks)
        .context("Playback failed to start")?;
    if !report.completed {
        println!("Playback ended early");
    }
    Ok(())
}
