use bubblegrab::capture::x11::X11Capture;
use bubblegrab::io::{load_template, PngDebugSink};
use bubblegrab::pointer::x11::X11Pointer;
use bubblegrab::{
    ChannelMode, DecisionLoop, FrameConverter, FrameSource, MatchResult, Matcher, PackedFrame,
    PacingConfig, PatternSet, RunConfig, StopToken, SystemClock, TemplatePattern,
    DEFAULT_THRESHOLD,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));
const DEFAULT_CONFIG: &str = "config.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Watches a game window and reacts to bonus and city glyphs")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
    /// Match in three-channel color instead of grayscale.
    #[arg(long)]
    color: bool,
    /// Score and visualize matches without moving the pointer.
    #[arg(long)]
    debug: bool,
    /// Score both templates against a screenshot and exit.
    #[arg(long, value_name = "IMAGE")]
    scan: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ChannelModeConfig {
    #[default]
    Grayscale,
    Color,
}

impl From<ChannelModeConfig> for ChannelMode {
    fn from(value: ChannelModeConfig) -> Self {
        match value {
            ChannelModeConfig::Grayscale => ChannelMode::Grayscale,
            ChannelModeConfig::Color => ChannelMode::Color,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PacingConfigJson {
    idle_ms: (u64, u64),
    cooldown_ms: (u64, u64),
}

impl Default for PacingConfigJson {
    fn default() -> Self {
        let cfg = PacingConfig::default();
        Self {
            idle_ms: cfg.idle_ms,
            cooldown_ms: cfg.cooldown_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    window_name: String,
    bonus_template: PathBuf,
    city_template: PathBuf,
    channel_mode: ChannelModeConfig,
    debug_visualization: bool,
    debug_dir: PathBuf,
    threshold: f64,
    pacing: PacingConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_name: "CivWorld on Facebook".to_string(),
            bonus_template: PathBuf::from("assets/bonus.png"),
            city_template: PathBuf::from("assets/city.png"),
            channel_mode: ChannelModeConfig::default(),
            debug_visualization: false,
            debug_dir: PathBuf::from("debug"),
            threshold: DEFAULT_THRESHOLD,
            pacing: PacingConfigJson::default(),
        }
    }
}

impl Config {
    fn run_config(&self, channel_mode: ChannelMode, debug_visualization: bool) -> RunConfig {
        RunConfig {
            channel_mode,
            debug_visualization,
            threshold: self.threshold,
            pacing: PacingConfig {
                idle_ms: self.pacing.idle_ms,
                cooldown_ms: self.pacing.cooldown_ms,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct MatchRecord {
    x: i32,
    y: i32,
    confidence: Option<f64>,
    hit: bool,
}

impl MatchRecord {
    fn new(result: &MatchResult, threshold: f64) -> Self {
        Self {
            x: result.location.x,
            y: result.location.y,
            confidence: (!result.is_degenerate()).then_some(result.confidence),
            hit: result.is_hit(threshold),
        }
    }
}

#[derive(Debug, Serialize)]
struct ScanOutput {
    bonus: MatchRecord,
    city: MatchRecord,
}

fn read_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound && path == Path::new(DEFAULT_CONFIG) => {
            Ok(Config::default())
        }
        Err(err) => Err(format!("failed to read {}: {err}", path.display()).into()),
    }
}

fn load_patterns(
    config: &Config,
    mode: ChannelMode,
) -> Result<(TemplatePattern, TemplatePattern), Box<dyn std::error::Error>> {
    let bonus = TemplatePattern::bonus(load_template(&config.bonus_template, mode)?)?;
    let city = TemplatePattern::city(load_template(&config.city_template, mode)?)?;
    Ok((bonus, city))
}

fn scan(
    image_path: &Path,
    bonus: &TemplatePattern,
    city: &TemplatePattern,
    run: &RunConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let screenshot = image::open(image_path)?.to_rgb8();
    let packed = PackedFrame::from_rgb_image(&screenshot)?;
    let frame = FrameConverter::new(run.channel_mode).convert(packed.view())?;

    let matcher = Matcher::new();
    let bonus = matcher.match_pattern(frame.view(), bonus)?;
    let city = matcher.match_pattern(frame.view(), city)?;
    let output = ScanOutput {
        bonus: MatchRecord::new(&bonus, run.threshold),
        city: MatchRecord::new(&city, run.threshold),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("bubblegrab=info".parse()?))
            .with_target(false)
            .with_writer(io::stderr)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config = read_config(&cli.config)?;
    let mode = if cli.color {
        ChannelMode::Color
    } else {
        config.channel_mode.into()
    };
    let run = config.run_config(mode, cli.debug || config.debug_visualization);
    run.validate()?;

    let (bonus, city) = load_patterns(&config, mode)?;

    if let Some(image_path) = cli.scan.as_deref() {
        return scan(image_path, &bonus, &city, &run);
    }

    println!("bubblegrab, version {}", env!("CARGO_PKG_VERSION"));

    let mut capture = X11Capture::initialize(&config.window_name)?;
    let patterns = PatternSet::new(bonus, city, capture.region(), mode)?;
    let pointer = X11Pointer::connect()?;

    let stop = StopToken::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        handler_stop.stop();
    })?;

    let debug = run.debug_visualization;
    let outcome = {
        let mut decision = DecisionLoop::new(
            &mut capture,
            pointer,
            SystemClock,
            patterns,
            run,
            io::stdout().lock(),
        )?;
        if debug {
            fs::create_dir_all(&config.debug_dir)?;
            decision = decision.with_debug_sink(Box::new(PngDebugSink::new(&config.debug_dir)));
        }
        decision.run(&stop)
    };

    capture.teardown()?;
    let summary = outcome?;
    tracing::info!(
        cycles = summary.cycles,
        hovers = summary.hovers,
        clicks = summary.clicks,
        idles = summary.idles,
        "stopped"
    );
    Ok(())
}
