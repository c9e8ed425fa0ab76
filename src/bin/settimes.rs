use anyhow::Context;
use clap::{ArgAction, Parser};
use mp4atom::{
    Source,
    retime::{RetimeOptions, parse_duration_table, retime},
};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Rewrite the frame durations of an MP4 file")]
struct Args {
    /// Source MP4 file
    input: PathBuf,

    /// Duration table: seconds per frame, or "count seconds" per line
    inputtime: PathBuf,

    /// Output file (default: <input>.set.mp4)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Track to retime, counting from 0
    #[arg(long, default_value_t = 0)]
    track: usize,

    /// Multiplier applied to every duration
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Track timescale, in ticks per second
    #[arg(long, default_value_t = 1000)]
    timeunit: u32,

    /// Print the report as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Debug logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let opts = RetimeOptions {
        timescale: args.timeunit,
        scale: args.scale,
        track: args.track,
    };
    let text = fs::read_to_string(&args.inputtime)
        .with_context(|| format!("reading {}", args.inputtime.display()))?;
    let table = parse_duration_table(&text, &opts)
        .with_context(|| format!("parsing {}", args.inputtime.display()))?;

    let output = args.output.clone().unwrap_or_else(|| {
        let mut name = args.input.clone().into_os_string();
        name.push(".set.mp4");
        PathBuf::from(name)
    });
    let mut tmp_name = output.clone().into_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let file = File::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    let source = Source::new(BufReader::new(file));
    let mut out = BufWriter::new(
        File::create(&tmp_path).with_context(|| format!("creating {}", tmp_path.display()))?,
    );

    let report = match retime(&source, &mut out, &table, &opts) {
        Ok(report) => report,
        Err(e) => {
            drop(out);
            let _ = fs::remove_file(&tmp_path);
            return Err(e).with_context(|| format!("retiming {}", args.input.display()));
        }
    };
    drop(out);
    fs::rename(&tmp_path, &output).with_context(|| format!("renaming to {}", output.display()))?;

    log::info!(
        "{}: {} frames, {:.3} s, moov {} -> {} bytes",
        output.display(),
        report.frames,
        report.seconds(),
        report.old_moov_size,
        report.new_moov_size
    );
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
