use crate::config::load_config;
use crate::model::TopologyState;
use crate::reconcile::Reconciler;
use crate::snapshot::{RawRow, parse_snapshot, rows_to_snapshot};
use crate::view::{RecordingRenderer, build_elements, write_element_dump};
use anyhow::Result;
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "nettopo", version, about = "Network topology reconciliation and layout")]
pub struct Args {
    /// Snapshot JSON file or '-' for stdin
    #[arg(short = 's', long = "snapshot")]
    pub snapshot: Option<PathBuf>,

    /// Spreadsheet import rows as a JSON array of header->value objects
    #[arg(short = 'r', long = "rows")]
    pub rows: Option<PathBuf>,

    /// Config JSON file (theme, layout, animation overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Element dump output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Seed for the scatter placement of ungrouped nodes
    #[arg(long = "seed", default_value_t = 7)]
    pub seed: u64,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let snapshot = if let Some(rows_path) = args.rows.as_deref() {
        let raw = read_input(Some(rows_path))?;
        let rows: Vec<RawRow> = serde_json::from_str(&raw)?;
        let (snapshot, errors) = rows_to_snapshot(&rows);
        for error in &errors {
            eprintln!("row {}: {}", error.row, error.reason);
        }
        snapshot
    } else {
        let raw = read_input(args.snapshot.as_deref())?;
        parse_snapshot(&raw)?
    };

    let mut state = TopologyState::new();
    let mut reconciler = Reconciler::new(&config.layout, args.seed);
    let mut renderer = RecordingRenderer::default();
    reconciler.reconcile(&mut state, &snapshot, &mut renderer)?;

    match args.output.as_deref() {
        Some(path) => write_element_dump(path, &state, &config.theme)?,
        None => {
            let elements = build_elements(&state, &config.theme);
            println!("{}", serde_json::to_string_pretty(&elements)?);
        }
    }

    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
