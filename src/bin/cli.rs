//! padloop CLI: offline rendering and live playback of a built-in demo.
//!
//! Usage:
//!   pl-cli render --out demo.wav --seconds 8 --bpm 100
//!   pl-cli play --seconds 8
//!   pl-cli info

use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pl_ir::{
    BankId, EffectSpec, GrooveId, Key, Part, PartConfig, PatternId, SampleBuffer, ScaleType, SlotId, GROOVES,
    SYNTH_BANK,
};
use pl_master::{Config, Controller, ControllerError, Project};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEMO_RATE: u32 = 44100;

#[derive(Parser)]
#[command(name = "pl-cli")]
#[command(about = "padloop sampler/sequencer", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the demo pattern to a WAV file
    Render {
        /// Output WAV file path
        #[arg(short, long)]
        out: PathBuf,

        /// Duration in seconds
        #[arg(short, long, default_value = "10.0")]
        seconds: f64,

        /// Tempo in BPM (default: the demo's 120)
        #[arg(short, long)]
        bpm: Option<f32>,
    },

    /// Play the demo pattern on the default output device
    Play {
        /// Duration in seconds
        #[arg(short, long, default_value = "10.0")]
        seconds: f64,

        #[arg(short, long)]
        bpm: Option<f32>,
    },

    /// List the groove templates
    Info,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ControllerError> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Render { out, seconds, bpm } => render(config, &out, seconds, bpm),
        Commands::Play { seconds, bpm } => play(config, seconds, bpm),
        Commands::Info => {
            print_grooves();
            Ok(())
        }
    }
}

fn render(config: Config, out: &Path, seconds: f64, bpm: Option<f32>) -> Result<(), ControllerError> {
    let project = demo_project(bpm);
    info!(path = %out.display(), seconds, sample_rate = config.sample_rate, "rendering");
    let buffer = pl_master::render_offline(&project, seconds, &config);
    pl_formats::write_wav_file(out, &buffer)?;
    println!("Wrote {} frames ({:.2} s, peak {:.3}) to {}", buffer.frames(), buffer.duration(), buffer.peak(), out.display());
    Ok(())
}

fn play(config: Config, seconds: f64, bpm: Option<f32>) -> Result<(), ControllerError> {
    let mut ctrl = Controller::with_output(config)?;
    ctrl.update_project(demo_project(bpm));
    ctrl.set_transport_playing(true);
    println!("Playing...");

    let start = std::time::Instant::now();
    while start.elapsed().as_secs_f64() < seconds {
        let pos = ctrl.track_snapshot(BankId::new(0)).position;
        print!(
            "\rPart {:?} | Step {:02} | Rep {} | Voices {:2} | Load {:4.1}%",
            pos.part,
            pos.step,
            pos.repetition,
            ctrl.voice_count(),
            ctrl.render_load() * 100.0
        );
        let _ = std::io::Write::flush(&mut std::io::stdout());
        std::thread::sleep(Duration::from_millis(20));
    }

    ctrl.set_transport_playing(false);
    // Let released voices ring out.
    std::thread::sleep(Duration::from_millis(300));
    println!("\rDone.{:60}", "");
    Ok(())
}

fn print_grooves() {
    println!("{:>3}  {:<14}  offsets (fraction of a step)", "id", "name");
    for (id, groove) in GROOVES.iter().enumerate() {
        let offsets: Vec<String> = groove.offsets.iter().map(|o| format!("{:+.2}", o)).collect();
        println!("{:>3}  {:<14}  {}", id, groove.name, offsets.join(" "));
    }
}

// --- Demo kit ---

/// Deterministic white noise.
struct Noise(u32);

impl Noise {
    fn next(&mut self) -> f32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0 as f32 / u32::MAX as f32 * 2.0 - 1.0
    }
}

fn synthesize(seconds: f32, mut f: impl FnMut(f32) -> f32) -> SampleBuffer {
    let frames = (seconds * DEMO_RATE as f32) as usize;
    let data = (0..frames).map(|i| f(i as f32 / DEMO_RATE as f32)).collect();
    SampleBuffer::mono(data, DEMO_RATE)
}

fn kick() -> SampleBuffer {
    let mut phase = 0.0f32;
    synthesize(0.45, |t| {
        let freq = 45.0 + 110.0 * (-t * 30.0).exp();
        phase += freq / DEMO_RATE as f32;
        (phase * TAU).sin() * (-t * 7.0).exp()
    })
}

fn snare() -> SampleBuffer {
    let mut noise = Noise(0x1234_5678);
    synthesize(0.25, |t| {
        let body = (t * 185.0 * TAU).sin() * (-t * 25.0).exp();
        (0.6 * noise.next() * (-t * 14.0).exp() + 0.4 * body) * 0.8
    })
}

fn hat() -> SampleBuffer {
    let mut noise = Noise(0x9e37_79b9);
    synthesize(0.08, |t| noise.next() * (-t * 60.0).exp() * 0.5)
}

/// A two-part beat on bank 0 and a synth line on the synth bank.
fn demo_project(bpm: Option<f32>) -> Project {
    let mut project = Project::new();
    if let Some(bpm) = bpm {
        project.tempo = bpm;
    }

    let drums = BankId::new(0);
    let (kick_slot, snare_slot, hat_slot) =
        (SlotId::from_bank_lane(drums, 0), SlotId::from_bank_lane(drums, 1), SlotId::from_bank_lane(drums, 2));
    for (slot, name, buffer) in [(kick_slot, "kick", kick()), (snare_slot, "snare", snare()), (hat_slot, "hat", hat())] {
        let s = project.slots.get_mut(slot);
        s.set_name(name);
        s.buffer = Some(std::sync::Arc::new(buffer));
    }
    project.slots.get_mut(hat_slot).params.highpass = 5000.0;

    let bank = project.bank_mut(drums);
    bank.groove = GrooveId(2);
    bank.groove_depth = 0.8;
    let beat = project.patterns_mut().get_mut(PatternId::new(0));
    *beat.part_mut(Part::A) = PartConfig::new(16, 16, 3);
    *beat.part_mut(Part::B) = PartConfig::new(16, 8, 2);
    for step in [0, 6, 8, 16, 19, 20] {
        beat.toggle_step(0, step);
    }
    for step in [4, 12, 20] {
        beat.toggle_step(1, step);
    }
    for step in (0..16).step_by(2).chain(16..24) {
        beat.toggle_step(2, step);
    }
    beat.lane_mut(2).set_lock(pl_ir::LockParam::Volume, 22, Some(0.3));

    let synth = SYNTH_BANK.first_pattern();
    let line = project.patterns_mut().get_mut(synth);
    line.key = Key::new(9, ScaleType::Minor);
    *line.part_mut(Part::A) = PartConfig::new(8, 8, 1);
    *line.part_mut(Part::B) = PartConfig::new(8, 8, 1);
    for (step, note) in [(0, 57), (3, 60), (6, 64), (16, 55), (19, 59), (22, 62)] {
        line.record_step(0, step, note, 96);
    }
    project.slots.get_mut(SlotId::from_bank_lane(SYNTH_BANK, 0)).params.decay = 0.15;
    project.slots.get_mut(SlotId::from_bank_lane(SYNTH_BANK, 0)).params.lowpass = 1800.0;
    project.bank_mut(SYNTH_BANK).volume = 0.5;
    project.bank_mut(SYNTH_BANK).pan = 0.3;

    project.master.effects = vec![EffectSpec::Delay { time_ms: 375.0, feedback: 0.35, mix: 0.2 }];
    project
}
