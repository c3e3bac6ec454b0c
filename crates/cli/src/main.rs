use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use slidesync_core::matching::infrastructure::matcher_factory::opencv_components;
use slidesync_core::pipeline::match_slides_use_case::{MatchOutcome, MatchSlidesUseCase};
use slidesync_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use slidesync_core::shared::config::MatchingConfig;
use slidesync_core::slides::infrastructure::slide_decoder::{collect_slide_paths, read_slide_files};
use slidesync_core::transcript::infrastructure::transcript_file::load_segments;
use slidesync_core::video::domain::video_source::VideoSource;
use slidesync_core::video::infrastructure::ffmpeg_frame_sampler::FfmpegFrameSampler;

/// Assign lecture transcript segments to the slides shown in the recording.
#[derive(Parser, Debug)]
#[command(name = "slidesync")]
struct Cli {
    /// Slide images, or directories of them (sorted by file name).
    #[arg(long, required = true, num_args = 1..)]
    slides: Vec<PathBuf>,

    /// Transcript JSON: a segment array or an object with a `segments` array.
    #[arg(long)]
    transcript: PathBuf,

    /// Lecture recording: a local file, or an http(s) URL.
    #[arg(long, conflicts_with = "video_url")]
    video: Option<String>,

    /// Remote-only recording; no frames are analysed.
    #[arg(long)]
    video_url: Option<String>,

    /// Output file (stdout when omitted).
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// JSON file with matching settings; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds between analysed frames.
    #[arg(long)]
    frame_interval: Option<f64>,

    /// Confidence below which a frame counts as showing no slide.
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Minimum RANSAC inliers for a slide match.
    #[arg(long)]
    min_inliers: Option<usize>,

    /// Lowe ratio for binary descriptors.
    #[arg(long)]
    ratio: Option<f32>,

    /// Consecutive frames needed to confirm a slide change.
    #[arg(long)]
    confirm: Option<usize>,

    /// Give up on frame analysis after this many seconds.
    #[arg(long)]
    timeout: Option<f64>,

    /// Disable the whole-image template fallback.
    #[arg(long)]
    no_template: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    validate(&cli)?;

    let slide_paths = collect_slide_paths(&cli.slides)?;
    if slide_paths.is_empty() {
        log::warn!("No slide images found, every segment will be assigned to slide 0");
    }
    let slides = read_slide_files(&slide_paths);
    let segments = load_segments(&cli.transcript)?;
    let video = video_source(&cli);
    log::info!(
        "Loaded {} slides and {} transcript segments",
        slides.len(),
        segments.len()
    );

    let components = opencv_components(&config);
    let mut use_case = MatchSlidesUseCase::new(
        config,
        components,
        Box::new(FfmpegFrameSampler::new()),
        Box::new(StdoutPipelineLogger::default()),
        None,
    );
    let outcome = use_case.execute(&video, &slides, &segments);
    write_outcome(&outcome, cli.output.as_ref())
}

fn build_config(cli: &Cli) -> Result<MatchingConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => MatchingConfig::from_json_file(path)?,
        None => MatchingConfig::default(),
    };
    if let Some(v) = cli.frame_interval {
        config.frame_interval_seconds = v;
    }
    if let Some(v) = cli.min_confidence {
        config.min_confidence = v;
    }
    if let Some(v) = cli.min_inliers {
        config.min_inliers = v;
    }
    if let Some(v) = cli.ratio {
        config.ratio_test_threshold = v;
    }
    if let Some(v) = cli.confirm {
        config.change_confirm_threshold = v;
    }
    if let Some(v) = cli.timeout {
        config.timeout_seconds = Some(v);
    }
    if cli.no_template {
        config.enable_template_fallback = false;
    }
    config.validate()?;
    Ok(config)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for path in &cli.slides {
        if !path.exists() {
            return Err(format!("Slide path not found: {}", path.display()).into());
        }
    }
    if !cli.transcript.is_file() {
        return Err(format!("Transcript not found: {}", cli.transcript.display()).into());
    }
    if let VideoSource::Local(path) = video_source(cli) {
        if !path.is_file() {
            return Err(format!("Video file not found: {}", path.display()).into());
        }
    }
    Ok(())
}

fn video_source(cli: &Cli) -> VideoSource {
    match (&cli.video, &cli.video_url) {
        (Some(location), _) => VideoSource::from_location(location),
        (None, Some(url)) => VideoSource::Remote(url.trim().to_string()),
        (None, None) => VideoSource::Unavailable,
    }
}

fn write_outcome(
    outcome: &MatchOutcome,
    output: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(outcome)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            log::info!("Output written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
