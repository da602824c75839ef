use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use sac::{CoderConfig, EncodeOptions, MtMode, OptimizeConfig, Preset};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sac", version, about = "SAC lossless audio codec", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a WAV or FLAC file to sac
    Encode {
        /// Input audio file (integer PCM, up to 16 bit, mono or stereo)
        input: PathBuf,
        /// Output sac file
        output: PathBuf,
        #[command(flatten)]
        preset: PresetArgs,
        #[command(flatten)]
        tuning: TuningArgs,
    },
    /// Decode a sac file to WAV
    Decode {
        /// Input sac file
        input: PathBuf,
        /// Output WAV file
        output: PathBuf,
        /// 0 single threaded, 1 channels in parallel
        #[arg(long = "mt-mode", value_name = "0|1|2")]
        mt_mode: Option<u8>,
        /// Worker threads, 0 uses all cores
        #[arg(long, default_value_t = 0)]
        threads: usize,
    },
    /// Show information about a sac file
    List {
        /// Input sac file
        input: PathBuf,
        /// Also print every frame and channel block
        #[arg(long)]
        full: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode and verify the checksum
    Validate {
        /// Input sac file
        input: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
#[group(multiple = false)]
struct PresetArgs {
    /// No coefficient search (default)
    #[arg(long)]
    normal: bool,
    /// Short coefficient search per frame
    #[arg(long)]
    high: bool,
    /// Longer search on a wider window
    #[arg(long)]
    veryhigh: bool,
    /// Long search on half of every frame
    #[arg(long)]
    best: bool,
    /// Longest search
    #[arg(long)]
    insane: bool,
}

impl PresetArgs {
    fn preset(&self) -> Option<Preset> {
        [
            (self.normal, Preset::Normal),
            (self.high, Preset::High),
            (self.veryhigh, Preset::VeryHigh),
            (self.best, Preset::Best),
            (self.insane, Preset::Insane),
        ]
        .into_iter()
        .find_map(|(set, preset)| set.then_some(preset))
    }
}

#[derive(Args, Debug, Default)]
struct TuningArgs {
    /// Coefficient search as "fraction,evaluations[,cost]" or "no"
    #[arg(long, value_name = "FRAC,N[,COST]|no")]
    optimize: Option<String>,
    /// Max frame length in seconds
    #[arg(long, value_name = "SECS")]
    framelen: Option<u32>,
    /// 0 single threaded, 1 channels in parallel, 2 also the search
    #[arg(long = "mt-mode", value_name = "0|1|2")]
    mt_mode: Option<u8>,
    /// Worker threads, 0 uses all cores
    #[arg(long)]
    threads: Option<usize>,
    /// Try the sparse value remap
    #[arg(long, value_name = "yes|no", value_parser = parse_yes_no)]
    sparse_pcm: Option<bool>,
    /// Mid/side decorrelation for stereo input
    #[arg(long)]
    stereo_ms: bool,
    /// Remove the per-frame dc offset
    #[arg(long, value_name = "yes|no", value_parser = parse_yes_no)]
    zero_mean: Option<bool>,
    /// Start every frame's search from the default coefficients
    #[arg(long)]
    reset_profile: bool,
    /// Load the full coder configuration from a JSON file first
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,
}

fn parse_yes_no(s: &str) -> std::result::Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "yes" | "y" | "on" | "1" | "true" => Ok(true),
        "no" | "n" | "off" | "0" | "false" => Ok(false),
        other => Err(format!("expected yes or no, got '{other}'")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Encode {
            input,
            output,
            preset,
            tuning,
        } => {
            let config = build_config(&preset, &tuning, cli.verbose)?;
            encode(&input, &output, config)?;
        }
        Commands::Decode {
            input,
            output,
            mt_mode,
            threads,
        } => {
            let mt_mode = mt_mode.map(MtMode::from_level).unwrap_or_default();
            decode(&input, &output, mt_mode, threads)?;
        }
        Commands::List { input, full, json } => {
            list(&input, full, json)?;
        }
        Commands::Validate { input } => {
            validate(&input)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// json file first, then the preset, then single options on top
fn build_config(preset: &PresetArgs, tuning: &TuningArgs, verbose: u8) -> Result<CoderConfig> {
    let mut config = match &tuning.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            CoderConfig::from_json(&json).context("Invalid configuration file")?
        }
        None => CoderConfig::default(),
    };

    if let Some(p) = preset.preset() {
        config.apply_preset(p);
    }
    if let Some(spec) = &tuning.optimize {
        let parsed = OptimizeConfig::parse_spec(spec).context("Invalid --optimize")?;
        config.optimize.enabled = parsed.enabled;
        if parsed.enabled {
            config.optimize.fraction = parsed.fraction;
            config.optimize.max_evals = parsed.max_evals;
            config.optimize.cost = parsed.cost;
        }
    }
    if let Some(secs) = tuning.framelen {
        config.frame_secs = secs;
    }
    if let Some(level) = tuning.mt_mode {
        config.mt_mode = MtMode::from_level(level);
    }
    if let Some(threads) = tuning.threads {
        config.threads = threads;
    }
    if let Some(on) = tuning.sparse_pcm {
        config.sparse_pcm = on;
    }
    if tuning.stereo_ms {
        config.stereo_ms = true;
    }
    if let Some(on) = tuning.zero_mean {
        config.zero_mean = on;
    }
    if tuning.reset_profile {
        config.optimize.reset_profile = true;
    }
    config.verbose = verbose;

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn encode(input: &Path, output: &Path, config: CoderConfig) -> Result<()> {
    println!("Reading {}...", input.display());
    let start = Instant::now();
    let source = sac::audio::read_audio_file(input).context("Failed to read audio file")?;

    println!("  Sample rate: {} Hz", source.sample_rate);
    println!("  Channels:    {}", source.channels);
    println!("  Bits:        {}", source.bits_per_sample);
    println!("  Duration:    {:.2}s", source.duration_secs());

    if config.optimize.enabled {
        println!(
            "Encoding (search {:.1}% of each frame, {} evaluations, cost {})...",
            config.optimize.fraction * 100.0,
            config.optimize.max_evals,
            config.optimize.cost
        );
    } else {
        println!("Encoding...");
    }

    let options = EncodeOptions::default().with_config(config);
    let (sac_data, report) = sac::encode_from_samples(&source, &options, &mut |p| {
        tracing::info!(
            frame = p.frame,
            "{:.1}% ({}/{})",
            p.fraction() * 100.0,
            p.samples_done,
            p.samples_total
        );
    })?;

    fs::write(output, &sac_data).context("Failed to write output file")?;

    let pcm_bytes = source.samples.len() * (source.bits_per_sample as usize).div_ceil(8);
    let ratio = pcm_bytes as f64 / sac_data.len() as f64;
    let bps = if source.samples.is_empty() {
        0.0
    } else {
        sac_data.len() as f64 * 8.0 / source.samples.len() as f64
    };

    println!("Done!");
    println!("  Output:      {}", output.display());
    println!(
        "  Size:        {} -> {} bytes ({:.3}x, {:.3} bps)",
        pcm_bytes,
        sac_data.len(),
        ratio,
        bps
    );
    println!(
        "  Time:        {:.2}s (predict {:.2}s, encode {:.2}s, {} frames)",
        start.elapsed().as_secs_f64(),
        report.predict_time.as_secs_f64(),
        report.encode_time.as_secs_f64(),
        report.frames
    );

    Ok(())
}

fn decode(input: &Path, output: &Path, mt_mode: MtMode, threads: usize) -> Result<()> {
    println!("Reading {}...", input.display());
    let sac_data = fs::read(input).context("Failed to read sac file")?;
    let start = Instant::now();

    let decoded = sac::decode_to_samples(&sac_data, mt_mode, threads)?;
    let wav = sac::audio::write_wav_to_bytes(
        &decoded.samples,
        decoded.sample_rate,
        decoded.channels,
        decoded.bits_per_sample,
    )
    .context("Failed to write WAV data")?;
    fs::write(output, wav).context("Failed to write WAV file")?;

    println!("Done!");
    println!("  Output:      {}", output.display());
    println!("  Time:        {:.2}s", start.elapsed().as_secs_f64());
    if decoded.checksum_ok {
        println!("  Checksum:    ok");
    } else {
        // the audio is still written; `validate` is the strict check
        eprintln!("  Checksum:    MISMATCH, {} is damaged", input.display());
    }
    Ok(())
}

fn list(input: &Path, full: bool, json: bool) -> Result<()> {
    let sac_data = fs::read(input).context("Failed to read sac file")?;
    let info = sac::get_sac_info(&sac_data)?;

    if json {
        let frames = if full {
            Some(sac::list_frames(&sac_data)?)
        } else {
            None
        };
        let value = serde_json::json!({
            "info": info,
            "frames": frames.map(|f| f.iter().map(frame_json).collect::<Vec<_>>()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("SAC Audio File");
    println!("───────────────────────────────");
    println!("  Version:     {}", info.version);
    println!("  Sample rate: {} Hz", info.sample_rate);
    println!("  Channels:    {}", info.channels);
    println!("  Bits:        {}", info.bits_per_sample);
    println!("  Duration:    {:.2}s", info.duration_secs);
    println!("  Samples:     {}", info.num_samples);
    println!("  Frames:      {} (max {} samples)", info.num_frames, info.frame_len);
    println!("  File size:   {} bytes", info.file_size);
    println!("  Ratio:       {:.3}x ({:.3} bps)", info.compression_ratio, info.coded_bps);
    println!("  Optimized:   {}", if info.optimized { "yes" } else { "no" });
    println!("  Mid/side:    {}", if info.mid_side { "yes" } else { "no" });

    if let Some(meta) = &info.metadata {
        println!("  Encoder:     {}", meta.encoder);
        if let Some(at) = &meta.encoded_at {
            println!("  Encoded at:  {}", at);
        }
        if let Some(src) = &meta.source_format {
            println!("  Source:      {}", src);
        }
        for (k, v) in &meta.tags {
            println!("  {:<12} {}", format!("{k}:"), v);
        }
    }

    if full {
        println!();
        println!(
            "{:>6} {:>8} {:>3} {:>9} {:>7} {:>7} {:>7} {:>4} {:>4}",
            "frame", "samples", "ch", "bytes", "mean", "min", "max", "bits", "map"
        );
        for frame in sac::list_frames(&sac_data)? {
            for (ch, b) in frame.blocks.iter().enumerate() {
                println!(
                    "{:>6} {:>8} {:>3} {:>9} {:>7} {:>7} {:>7} {:>4} {:>4}",
                    frame.index,
                    frame.num_samples,
                    if b.mid_side { ["m", "s"][ch.min(1)] } else { ["0", "1"][ch.min(1)] },
                    b.blocksize,
                    b.mean,
                    b.minval,
                    b.maxval,
                    b.bits,
                    if b.mapped { "yes" } else { "-" }
                );
            }
        }
    }

    Ok(())
}

fn frame_json(frame: &sac::FrameSummary) -> serde_json::Value {
    serde_json::json!({
        "index": frame.index,
        "samples": frame.num_samples,
        "bytes": frame.total_bytes(),
        "blocks": frame.blocks.iter().map(|b| serde_json::json!({
            "bytes": b.blocksize,
            "mean": b.mean,
            "min": b.minval,
            "max": b.maxval,
            "bits": b.bits,
            "mapped": b.mapped,
            "mid_side": b.mid_side,
        })).collect::<Vec<_>>(),
    })
}

fn validate(input: &Path) -> Result<()> {
    let sac_data = fs::read(input).context("Failed to read sac file")?;

    if sac::validate_sac(&sac_data)? {
        println!("✓ {} is a valid sac file", input.display());
        Ok(())
    } else {
        bail!("✗ {} does not match its checksum", input.display())
    }
}
