//! Fumen to JSON dumper

use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tja2fumen::fumen::{reader, Endian, FumenJson};

#[derive(Parser, Debug)]
#[command(name = "fumen2json")]
#[command(version = "0.1.0")]
#[command(about = "Dump Fumen .bin files as JSON", long_about = None)]
struct Args {
    /// Input Fumen file (plain or gzipped)
    input: PathBuf,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,

    /// Byte order of the input (detected from the header by default)
    #[arg(short, long, value_enum, default_value_t = Order::Detect)]
    endian: Order,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Order {
    Detect,
    Little,
    Big,
}

impl Order {
    fn endian(self) -> Option<Endian> {
        match self {
            Order::Detect => None,
            Order::Little => Some(Endian::Little),
            Order::Big => Some(Endian::Big),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let course = reader::read_file(&args.input, args.endian.endian())?;
    let json = FumenJson::new(&course);

    let json_string = if args.compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };

    match args.output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(json_string.as_bytes())?;
            file.write_all(b"\n")?;
        }
        None => {
            println!("{}", json_string);
        }
    }

    Ok(())
}
