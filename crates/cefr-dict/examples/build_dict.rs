use std::env;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use cefr_dict::{Dictionary, LoadMode, build_from_jsonl};

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let usage =
        "usage: cargo run -p cefr-dict --example build_dict -- <input.jsonl> <out-dir> [word...]";
    let input = args.next().map(PathBuf::from).context(usage)?;
    let out_dir = args.next().map(PathBuf::from).context(usage)?;
    let lookups: Vec<String> = args.collect();
    if !input.exists() {
        bail!("input file not found: {}", input.display());
    }

    fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    let reader = BufReader::new(
        File::open(&input).with_context(|| format!("open {}", input.display()))?,
    );

    let start = Instant::now();
    let summary = build_from_jsonl(reader, &out_dir)
        .with_context(|| format!("building dictionary from {}", input.display()))?;
    println!(
        "Built {} words ({} duplicates dropped, {} data bytes) in {:?}",
        summary.words,
        summary.duplicates,
        summary.data_bytes,
        start.elapsed()
    );

    if lookups.is_empty() {
        return Ok(());
    }
    let dict = Dictionary::open(&out_dir, LoadMode::Mmap)
        .with_context(|| format!("reopen {}", out_dir.display()))?;
    for (word, outcome) in dict.lookup_many(&lookups) {
        println!("{word}: {}", serde_json::to_string(&outcome)?);
    }
    Ok(())
}
