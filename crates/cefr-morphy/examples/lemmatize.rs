use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cefr_morphy::Morphy;
use cefr_types::CoarsePos;

fn main() -> Result<()> {
    let mut args = env::args().skip(1).peekable();
    let morph = if args.peek().map(String::as_str) == Some("--exc-dir") {
        args.next();
        let dir = args
            .next()
            .map(PathBuf::from)
            .context("--exc-dir needs a directory")?;
        Morphy::load(&dir).with_context(|| format!("loading exceptions from {}", dir.display()))?
    } else {
        Morphy::english()
    };

    let words: Vec<String> = args.collect();
    if words.is_empty() {
        bail!(
            "usage: cargo run -p cefr-morphy --example lemmatize -- [--exc-dir <dir>] <word>..."
        );
    }

    println!("Exception forms: {}", morph.exception_count());
    for word in words {
        println!("\nSurface: {}", word);
        for pos in CoarsePos::OPEN {
            println!("  {:<5} {}", pos, morph.lemmatize(&word, pos));
        }
    }

    Ok(())
}
