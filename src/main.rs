use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pose_normalizer::{analysis, Analyzer, NormalizedAnalysis};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Video to analyze. The analyzer writes its result next to it as `<video>.json`.
    #[structopt(required_unless = "input")]
    video: Option<PathBuf>,

    /// Normalize an existing analysis file instead of running the analyzer.
    #[structopt(short, long, conflicts_with = "video")]
    input: Option<PathBuf>,

    /// Where to write the normalized poses. Defaults to stdout.
    #[structopt(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the normalized JSON.
    #[structopt(short, long)]
    pretty: bool,

    #[structopt(flatten)]
    analyzer: Analyzer,

    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    #[structopt(short, long)]
    show_progress: bool,
}

fn write_normalized<W>(writer: W, normalized: &NormalizedAnalysis, pretty: bool) -> Result<()>
where
    W: Write,
{
    let mut writer = BufWriter::new(writer);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, normalized)
    } else {
        serde_json::to_writer(&mut writer, normalized)
    }
    .context("failed serializing normalized poses")?;
    writeln!(writer).context("failed writing normalized poses")?;
    writer.flush().context("failed flushing normalized poses")?;
    Ok(())
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(opt.log_level),
    )?;

    let analysis_path = match (opt.input, opt.video) {
        (Some(input), _) => input,
        (None, Some(video)) => {
            let running = Arc::new(AtomicBool::new(true));
            let running_ctrl_c = running.clone();

            ctrlc::set_handler(move || {
                running_ctrl_c.store(false, Ordering::SeqCst);
            })
            .context("failed setting Ctrl-C handler")?;

            let progress = if opt.show_progress {
                Some(
                    ProgressBar::new_spinner().with_style(
                        ProgressStyle::default_spinner()
                            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                            .template("{prefix:.bold.dim} {spinner} {wide_msg}"),
                    ),
                )
            } else {
                None
            };
            if let Some(progress) = progress.as_ref() {
                progress.set_prefix(video.display().to_string());
            }

            let output = opt
                .analyzer
                .run(&video, &running, progress.as_ref())
                .with_context(|| format!("failed analyzing {}", video.display()))?;

            if let Some(progress) = progress {
                progress.finish_and_clear();
            }
            output
        }
        (None, None) => anyhow::bail!("either a video or --input is required"),
    };

    let raw = analysis::load(&analysis_path)
        .with_context(|| format!("failed loading {}", analysis_path.display()))?;

    if let Some(metadata) = raw.video_metadata() {
        info!(
            message = "video metadata",
            fps = ?metadata.fps,
            width = ?metadata.width,
            height = ?metadata.height,
            seconds = ?metadata.duration(raw.num_frames())?
        );
    }

    let normalized = NormalizedAnalysis::new(&raw).context("failed normalizing poses")?;

    match opt.output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed creating {}", path.display()))?;
            write_normalized(file, &normalized, opt.pretty)?;
            info!(message = "wrote normalized poses", path = %path.display());
        }
        None => write_normalized(std::io::stdout().lock(), &normalized, opt.pretty)?,
    }

    Ok(())
}
