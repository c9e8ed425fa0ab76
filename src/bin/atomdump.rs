use anyhow::Context;
use clap::{ArgAction, Parser};
use mp4atom::{Atom, FourCC, KnownBox, Source, parse_file, summarize, util::hex_dump};
use std::fs::File;
use std::io::BufReader;

#[derive(Parser, Debug)]
#[command(version, about = "MP4/QuickTime atom tree explorer")]
struct Args {
    /// MP4/QuickTime file path
    path: String,

    /// Only print subtree(s) matching a dotted path (e.g. moov.trak[0].mdia.minf.stbl)
    #[arg(long = "filter")]
    filter: Option<String>,

    /// Dump raw content of every atom with this type tag (e.g. --raw stts)
    #[arg(long = "raw")]
    raw: Option<String>,

    /// Limit recursion depth for the tree output
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Bytes to dump per atom with --raw (0 means all content)
    #[arg(long, default_value_t = 0)]
    bytes: usize,

    /// Emit JSON instead of the human-readable tree
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

    let file = File::open(&args.path).with_context(|| format!("opening {}", args.path))?;
    let source = Source::new(BufReader::new(file));
    let top = parse_file(&source).with_context(|| format!("parsing {}", args.path))?;

    let targets: Vec<&Atom> = match &args.filter {
        Some(path) => select_by_path(&top, path),
        None => top.iter().collect(),
    };

    if args.json {
        let summaries = targets
            .iter()
            .map(|a| summarize(a))
            .collect::<mp4atom::Result<Vec<_>>>()?;
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    for atom in &targets {
        print_atom(atom, 0, args.max_depth);
    }

    if let Some(sel) = &args.raw {
        let typ: FourCC = sel.parse().with_context(|| format!("bad type tag '{}'", sel))?;
        let mut matches = Vec::new();
        for atom in &top {
            select_type(atom, typ, &mut matches);
        }
        for (i, atom) in matches.into_iter().enumerate() {
            dump_raw(i, atom, args.bytes)?;
        }
    }
    Ok(())
}

fn print_atom(atom: &Atom, depth: usize, max_depth: usize) {
    let indent = "  ".repeat(depth);
    let offset = atom
        .source_offset()
        .map(|o| format!("{:#x}", o))
        .unwrap_or_else(|| "-".into());
    let name = KnownBox::from(atom.typ()).full_name();
    if atom.is_container() {
        println!(
            "{indent}{:>8} {:>10} {} ({}, {} children) {}",
            offset,
            atom.total_size(),
            atom.typ(),
            atom.kind(),
            atom.len(),
            name
        );
        if depth < max_depth {
            for kid in atom {
                print_atom(kid, depth + 1, max_depth);
            }
        }
    } else {
        println!(
            "{indent}{:>8} {:>10} {} {}",
            offset,
            atom.total_size(),
            atom.typ(),
            name
        );
    }
}

fn select_type<'a>(atom: &'a Atom, typ: FourCC, out: &mut Vec<&'a Atom>) {
    if atom.typ() == typ {
        out.push(atom);
    }
    for kid in atom {
        select_type(kid, typ, out);
    }
}

fn dump_raw(i: usize, atom: &Atom, limit: usize) -> anyhow::Result<()> {
    if atom.is_normal_container() {
        println!("\n== Dump {} ({}) has no raw content ==", i, atom.typ());
        return Ok(());
    }
    let mut copy = atom.clone();
    let data = if limit == 0 {
        copy.read_all()?
    } else {
        copy.read_bytes(limit)?
    };
    let off = atom.source_offset().unwrap_or(0);
    println!(
        "\n== Dump {} ({}) content: offset={:#x}, len={} ==",
        i,
        atom.typ(),
        off,
        data.len()
    );
    print!("{}", hex_dump(&data, off));
    Ok(())
}

// moov.trak[0].mdia.minf.stbl
fn select_by_path<'a>(roots: &'a [Atom], path: &str) -> Vec<&'a Atom> {
    let mut current: Vec<&'a Atom> = Vec::new();

    for (depth, seg) in path.split('.').enumerate() {
        let (name, idx) = parse_segment(seg);
        let typ = name.parse::<FourCC>().unwrap_or(FourCC(*b"????"));
        let candidates: Vec<&'a Atom> = if depth == 0 {
            roots.iter().collect()
        } else {
            current.iter().copied().flat_map(Atom::children).collect()
        };
        let matches: Vec<&'a Atom> = candidates.into_iter().filter(|a| a.typ() == typ).collect();
        current = match idx {
            Some(i) => matches.get(i).copied().into_iter().collect(),
            None => matches,
        };
        if current.is_empty() {
            break;
        }
    }
    current
}

fn parse_segment(seg: &str) -> (&str, Option<usize>) {
    if let Some(l) = seg.find('[') {
        let name = &seg[..l];
        if let Some(r) = seg[l + 1..].find(']') {
            return (name, seg[l + 1..l + 1 + r].parse::<usize>().ok());
        }
        (name, None)
    } else {
        (seg, None)
    }
}
