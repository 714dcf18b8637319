// src/main.rs
// Scan files (or stdin) and print one token per line.
// Usage:
//   cargo run -- rules.json src.txt other.txt
//   cargo run -- tables/lexer_tables.bin < src.txt
//   RULELEX_SKIP_SEPARATORS=0 cargo run -- rules.json src.txt

use std::{
    env,
    io::{self, BufWriter, Write},
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use rulelex::{
    lexer::{
        CharSource, ReaderSource, Tokenizer, open_file,
        tables::{Tables, load_tables},
    },
    rules::RulesFile,
};

/// Treat any value other than "0"/"false" (case-insensitive) as true.
fn env_flag_true(var: &str, default: bool) -> bool {
    env::var(var)
        .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
        .unwrap_or(default)
}

/// A rule file is compiled on the spot; anything else must be persisted tables.
fn load(path: &Path) -> Result<(Arc<Tables>, bool)> {
    match RulesFile::load(path) {
        Ok(rules) => {
            let set = rules.to_rule_set();
            Ok((Arc::new(set.build()), set.skip_separators()))
        }
        Err(rules_err) => {
            log::debug!("{} is not a rule file: {rules_err:#}", path.display());
            let tables = load_tables(path)?;
            Ok((Arc::new(tables), true))
        }
    }
}

type Source = Box<dyn CharSource>;

fn dump(
    tok: &mut Tokenizer<Source>,
    source: Source,
    name: &str,
    out: &mut impl Write,
) -> Result<usize> {
    tok.bind(source).with_context(|| format!("read {name}"))?;
    let mut n = 0usize;
    while let Some(t) = tok.next_token().with_context(|| format!("scan {name}"))? {
        writeln!(
            out,
            "{name}:{}:{}\t{}\t{:?}",
            t.line(),
            t.column(),
            t.kind,
            t.text
        )?;
        n += 1;
    }
    tok.unbind().with_context(|| format!("close {name}"))?;
    Ok(n)
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(tables_path) = args.next() else {
        bail!("usage: rulelex <rules.json|tables.json|tables.bin> [input...]");
    };
    let inputs: Vec<String> = args.collect();

    let (tables, skip) = load(Path::new(&tables_path))?;
    let skip = env_flag_true("RULELEX_SKIP_SEPARATORS", skip);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut total = 0usize;
    let mut tok: Tokenizer<Source> = Tokenizer::new(tables).with_skip_separators(skip);

    if inputs.is_empty() {
        let stdin = Box::new(ReaderSource::new(io::stdin().lock()));
        total += dump(&mut tok, stdin, "<stdin>", &mut out)?;
    }
    for input in &inputs {
        let source = open_file(input).with_context(|| format!("open {input}"))?;
        total += dump(&mut tok, Box::new(source), input, &mut out)?;
    }
    out.flush()?;
    eprintln!("[rulelex] {total} tokens from {} input(s)", inputs.len().max(1));
    Ok(())
}
