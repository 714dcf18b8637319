// src/bin/gen_lex_tables.rs
// Compile a rule file once and write the tables for reuse without recompilation.
// Usage:
//   cargo run --bin gen_lex_tables -- rules.json                 # writes tables/lexer_tables.json
//   cargo run --bin gen_lex_tables -- rules.json out/lexer.bin   # compact binary form

use std::{env, fs, path::Path, time::Instant};

use anyhow::{Context, Result, bail};
use rulelex::{
    lexer::tables::{TokenKind, save_tables_bin, save_tables_json},
    rules::RulesFile,
};

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(rules_path) = args.next() else {
        bail!("usage: gen_lex_tables <rules.json> [out.json|out.bin]");
    };
    let out = args
        .next()
        .unwrap_or_else(|| "tables/lexer_tables.json".to_string());
    let out_path = Path::new(&out);

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }

    let rules = RulesFile::load(Path::new(&rules_path))?;
    let t0 = Instant::now();
    let tables = rules.to_rule_set().build();

    let exact = tables
        .token_kinds()
        .iter()
        .filter(|k| k.is_exact())
        .count();
    let words = tables
        .token_kinds()
        .iter()
        .filter(|&&k| k == TokenKind::Word)
        .count();
    println!(
        "[gen_lex_tables] {} states x {} symbols ({} exact-rule states, {} word states, {} lexemes) in {:?}",
        tables.n_states(),
        tables.n_symbols(),
        exact,
        words,
        tables.lexemes().len(),
        t0.elapsed()
    );

    let binary = out_path.extension().and_then(|e| e.to_str()) == Some("bin");
    if binary {
        save_tables_bin(out_path, &tables)
    } else {
        save_tables_json(out_path, &tables)
    }
    .with_context(|| format!("write {}", out_path.display()))?;

    let bytes = fs::metadata(out_path).map(|m| m.len()).unwrap_or(0);
    println!(
        "[gen_lex_tables] wrote {} bytes (~{:.1} KiB) → {}",
        bytes,
        bytes as f64 / 1024.0,
        out_path.display()
    );
    Ok(())
}
