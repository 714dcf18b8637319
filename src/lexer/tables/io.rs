// src/lexer/tables/io.rs
use std::{
    collections::BTreeMap,
    io::{BufWriter, Write},
    path::Path,
    time::Instant,
};

use anyhow::{Context, Result, anyhow, bail, ensure};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use super::{Tables, alphabet::Alphabet, dfa::StateId, tokens::TokenKind};

// -------------------- JSON (de)serialization --------------------

#[serde_as]
#[derive(Serialize, Deserialize)]
struct TablesDisk {
    #[serde_as(as = "Vec<(_, _)>")]
    alphabet: BTreeMap<char, u32>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    token_kinds: Vec<TokenKind>,
    transitions: Vec<Vec<StateId>>,
    #[serde_as(as = "Vec<(_, _)>")]
    lexemes: BTreeMap<String, StateId>,
}

impl From<&Tables> for TablesDisk {
    fn from(t: &Tables) -> Self {
        Self {
            alphabet: t.alphabet().pairs().into_iter().collect(),
            token_kinds: t.token_kinds().to_vec(),
            transitions: t.rows().map(<[StateId]>::to_vec).collect(),
            lexemes: t
                .lexemes()
                .into_iter()
                .map(|(text, s)| (text.to_owned(), s))
                .collect(),
        }
    }
}

impl TablesDisk {
    fn into_tables(self) -> Result<Tables> {
        let width = self.transitions.first().map_or(0, Vec::len) as u32;
        let alphabet = Alphabet::from_pairs(self.alphabet, width);
        let lexemes: HashMap<String, StateId> = self.lexemes.into_iter().collect();
        Tables::from_parts(alphabet, self.transitions, self.token_kinds, lexemes)
            .map_err(|e| anyhow!("invalid tables: {e}"))
    }
}

pub fn tables_to_json_string(t: &Tables) -> Result<String> {
    serde_json::to_string_pretty(&TablesDisk::from(t)).context("serialize tables")
}

pub fn save_tables_json(path: &Path, t: &Tables) -> std::io::Result<()> {
    let f = std::fs::File::create(path)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, &TablesDisk::from(t))?;
    w.flush()
}

pub fn load_tables_json_bytes(data: &[u8]) -> Result<Tables> {
    serde_json::from_slice::<TablesDisk>(data)
        .context("failed to parse tables JSON")?
        .into_tables()
}

// -------------------- Compact binary --------------------
//   magic: 8 bytes = "RLXTBL01"
//   u32 n_states, u32 width, u32 n_chars, u32 n_lexemes
//   n_chars   x (u32 char, u32 symbol)
//   n_states  x u8 token kind
//   n_states * width x u32 next state, row-major
//   n_lexemes x (u32 byte len, utf-8 bytes, u32 state)

const BIN_MAGIC: &[u8; 8] = b"RLXTBL01";

pub fn save_tables_bin(path: &Path, t: &Tables) -> std::io::Result<()> {
    let instant = Instant::now();
    let f = std::fs::File::create(path)?;
    let mut w = BufWriter::new(f);
    write_bin(&mut w, t)?;
    let flush = w.flush();
    log::debug!(
        "Saved tables to {} in {} ms",
        path.display(),
        instant.elapsed().as_millis()
    );
    flush
}

pub fn write_bin(w: &mut impl Write, t: &Tables) -> std::io::Result<()> {
    let pairs = t.alphabet().pairs();
    let lexemes = t.lexemes();

    w.write_all(BIN_MAGIC)?;
    for n in [t.n_states(), t.n_symbols(), pairs.len(), lexemes.len()] {
        w.write_all(&(n as u32).to_le_bytes())?;
    }
    for (c, s) in pairs {
        w.write_all(&(c as u32).to_le_bytes())?;
        w.write_all(&s.to_le_bytes())?;
    }
    let kinds: Vec<u8> = t.token_kinds().iter().map(|&k| k as u32 as u8).collect();
    w.write_all(&kinds)?;

    let mut row_bytes = Vec::with_capacity(t.n_symbols() * 4);
    for row in t.rows() {
        row_bytes.clear();
        for &s in row {
            row_bytes.extend_from_slice(&s.to_le_bytes());
        }
        w.write_all(&row_bytes)?;
    }
    for (text, s) in lexemes {
        w.write_all(&(text.len() as u32).to_le_bytes())?;
        w.write_all(text.as_bytes())?;
        w.write_all(&s.to_le_bytes())?;
    }
    Ok(())
}

#[inline]
fn take<'a>(buf: &mut &'a [u8], n: usize, what: &str) -> Result<&'a [u8]> {
    ensure!(buf.len() >= n, "truncated {what}");
    let (head, rest) = buf.split_at(n);
    *buf = rest;
    Ok(head)
}

#[inline]
fn take_u32(buf: &mut &[u8], what: &str) -> Result<u32> {
    let mut le = [0u8; 4];
    le.copy_from_slice(take(buf, 4, what)?);
    Ok(u32::from_le_bytes(le))
}

pub fn load_tables_bin_bytes(mut data: &[u8]) -> Result<Tables> {
    let magic = take(&mut data, 8, "magic")?;
    if magic != BIN_MAGIC {
        bail!("bad magic in tables .bin");
    }

    let n_states = take_u32(&mut data, "header")? as usize;
    let width = take_u32(&mut data, "header")? as usize;
    let n_chars = take_u32(&mut data, "header")? as usize;
    let n_lexemes = take_u32(&mut data, "header")? as usize;

    let cells = n_states
        .checked_mul(width)
        .ok_or_else(|| anyhow!("n_states * width overflow"))?;
    ensure!(
        cells.checked_mul(4).is_some_and(|b| b <= data.len()),
        "transition matrix of {n_states}x{width} exceeds the input"
    );

    let mut pairs = Vec::with_capacity(n_chars.min(data.len() / 8));
    for _ in 0..n_chars {
        let c = take_u32(&mut data, "alphabet")?;
        let c = char::from_u32(c).ok_or_else(|| anyhow!("invalid character {c:#x} in alphabet"))?;
        pairs.push((c, take_u32(&mut data, "alphabet")?));
    }

    let kinds = take(&mut data, n_states, "token kinds")?
        .iter()
        .map(|&b| TokenKind::try_from(b as u32).map_err(|v| anyhow!("unknown token kind {v}")))
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(n_states);
    for _ in 0..n_states {
        let mut row = Vec::with_capacity(width);
        for _ in 0..width {
            row.push(take_u32(&mut data, "transitions")?);
        }
        rows.push(row);
    }

    let mut lexemes = HashMap::new();
    for _ in 0..n_lexemes {
        let len = take_u32(&mut data, "lexeme length")? as usize;
        let text = std::str::from_utf8(take(&mut data, len, "lexeme")?)
            .context("lexeme is not UTF-8")?
            .to_owned();
        lexemes.insert(text, take_u32(&mut data, "lexeme state")?);
    }
    ensure!(data.is_empty(), "{} trailing bytes after tables", data.len());

    let alphabet = Alphabet::from_pairs(pairs, width as u32);
    Tables::from_parts(alphabet, rows, kinds, lexemes).map_err(|e| anyhow!("invalid tables: {e}"))
}

/// Loads tables from `path`, telling the binary form from JSON by its magic.
pub fn load_tables(path: &Path) -> Result<Tables> {
    let data = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let tables = if data.starts_with(BIN_MAGIC) {
        load_tables_bin_bytes(&data)
    } else {
        load_tables_json_bytes(&data)
    };
    tables.with_context(|| format!("load tables from {}", path.display()))
}
