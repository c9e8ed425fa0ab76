use anyhow::Context;
use clap::{ArgAction, Parser};
use mp4atom::{Source, durations};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(version, about = "Extract per-frame durations from MP4 files")]
struct Args {
    /// An .mp4 file, or a directory whose .mp4 files are all processed
    input: PathBuf,

    /// Directory receiving one <name>.time file per input
    outputpath: PathBuf,

    /// Track to read, counting from 0
    #[arg(long, default_value_t = 0)]
    track: usize,

    /// Print the timing tables as JSON as well
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

    let inputs = if args.input.is_file() {
        vec![args.input.clone()]
    } else {
        let mut found = Vec::new();
        for entry in fs::read_dir(&args.input)
            .with_context(|| format!("listing {}", args.input.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "mp4") {
                found.push(path);
            }
        }
        found.sort();
        found
    };

    let mut failed = 0;
    for input in &inputs {
        if let Err(e) = extract(input, &args) {
            log::error!("{}: {:#}", input.display(), e);
            failed += 1;
        }
    }
    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, inputs.len());
    }
    Ok(())
}

fn extract(input: &Path, args: &Args) -> anyhow::Result<()> {
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let source = Source::new(BufReader::new(file));
    let timing = durations::read_timing(&source)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&timing)?);
    }

    let track = timing.track(args.track)?;
    let frames = track.frame_durations()?;
    if let Some(secs) = track.duration_seconds() {
        log::info!(
            "{}: track {} has {} frames over {:.3} s",
            input.display(),
            args.track,
            frames.len(),
            secs
        );
    }

    let name = input
        .file_name()
        .with_context(|| format!("{} has no file name", input.display()))?;
    let mut out_name = name.to_os_string();
    out_name.push(".time");
    let out_path = args.outputpath.join(out_name);
    let mut tmp_name = out_path.clone().into_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut w = BufWriter::new(
        File::create(&tmp_path).with_context(|| format!("creating {}", tmp_path.display()))?,
    );
    durations::write_durations(&mut w, &frames)?;
    w.flush()?;
    drop(w);
    fs::rename(&tmp_path, &out_path)
        .with_context(|| format!("renaming to {}", out_path.display()))?;
    Ok(())
}
