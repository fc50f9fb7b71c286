use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use std::path::{Path, PathBuf};
use tja2fumen::convert::output_file_name;
use tja2fumen::fumen::{writer, Endian, HpTable};
use tja2fumen::{tja, ConvertOptions, Converter};

#[derive(Parser, Debug)]
#[command(name = "tja2fumen")]
#[command(version = "0.1.0")]
#[command(about = "Convert TJA charts to Fumen binaries", long_about = None)]
struct Args {
    /// Input TJA file
    input: PathBuf,

    /// Directory for the .bin files (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Suppress warnings
    #[arg(short, long)]
    silent: bool,

    /// Write big-endian files
    #[arg(short, long)]
    big_endian: bool,

    /// Reclassify dense don/ka runs as alternating notes
    #[arg(short, long)]
    alternate_notes: bool,

    /// CSV table of HP values by note count
    #[arg(long)]
    hp_table: Option<PathBuf>,

    /// Gzip the output files
    #[arg(short, long)]
    gzip: bool,
}

fn main() -> Result<(), tja2fumen::Error> {
    let args = Args::parse();

    let default_level = if args.silent { "error" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let options = ConvertOptions {
        silent: args.silent,
        endian: if args.big_endian {
            Endian::Big
        } else {
            Endian::Little
        },
        alternate_notes: args.alternate_notes,
    };
    let mut converter = Converter::new(options);
    if let Some(path) = &args.hp_table {
        let table = HpTable::load(path)?;
        info!("Loaded {} HP table row(s) from {}", table.len(), path.display());
        converter = converter.with_hp_table(table);
    }

    let mut warnings = converter.warnings();
    let song = tja::parse_file(&args.input, &mut warnings)?;
    if song.courses.is_empty() {
        warn!("No courses found in {}", args.input.display());
    }
    let courses = converter.convert_song(&song, &mut warnings)?;

    let stem = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "song".to_string());
    let out_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => args
            .input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    for course in &courses {
        let path = out_dir.join(output_file_name(&stem, &course.id));
        writer::write_file(&course.fumen, &path, args.gzip)?;
        info!("Wrote {} ({})", path.display(), course.name);
    }

    if !warnings.is_empty() {
        info!("{} warning(s) during conversion", warnings.len());
    }

    Ok(())
}
