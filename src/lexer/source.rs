// src/lexer/source.rs
// Where scanners read characters from. A source only has to hand out characters in order and
// report end of stream; it is never rewound.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

pub trait CharSource {
    /// Next character, or `None` once the stream is exhausted (or closed).
    fn read_char(&mut self) -> io::Result<Option<char>>;

    /// Releases the underlying resource. Reads after closing return `None`.
    fn close(&mut self) -> io::Result<()>;
}

impl<S: CharSource + ?Sized> CharSource for Box<S> {
    fn read_char(&mut self) -> io::Result<Option<char>> {
        (**self).read_char()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// In-memory text.
#[derive(Debug, Clone)]
pub struct StrSource {
    text: String,
    at: usize,
}

impl StrSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            at: 0,
        }
    }
}

impl CharSource for StrSource {
    fn read_char(&mut self) -> io::Result<Option<char>> {
        let ch = self.text[self.at..].chars().next();
        if let Some(c) = ch {
            self.at += c.len_utf8();
        }
        Ok(ch)
    }

    fn close(&mut self) -> io::Result<()> {
        self.at = self.text.len();
        Ok(())
    }
}

/// UTF-8 text pulled incrementally from a reader. Malformed UTF-8 is an `InvalidData` error.
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: Option<R>,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: Some(reader),
        }
    }

    pub fn into_inner(self) -> Option<R> {
        self.inner
    }
}

/// Opens `path` as a buffered UTF-8 source.
pub fn open_file(path: impl AsRef<Path>) -> io::Result<ReaderSource<BufReader<File>>> {
    Ok(ReaderSource::new(BufReader::new(File::open(path)?)))
}

fn utf8_len(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_owned())
}

impl<R: BufRead> CharSource for ReaderSource<R> {
    fn read_char(&mut self) -> io::Result<Option<char>> {
        let Some(r) = self.inner.as_mut() else {
            return Ok(None);
        };
        let mut buf = [0u8; 4];
        let mut have = 0usize;
        let mut want = 1usize;
        while have < want {
            let chunk = r.fill_buf()?;
            if chunk.is_empty() {
                return if have == 0 {
                    Ok(None)
                } else {
                    Err(invalid("stream ends inside a UTF-8 sequence"))
                };
            }
            if have == 0 {
                want = utf8_len(chunk[0]).ok_or_else(|| invalid("invalid UTF-8 lead byte"))?;
            }
            let take = (want - have).min(chunk.len());
            buf[have..have + take].copy_from_slice(&chunk[..take]);
            r.consume(take);
            have += take;
        }
        let s = std::str::from_utf8(&buf[..want]).map_err(|_| invalid("invalid UTF-8 sequence"))?;
        Ok(s.chars().next())
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner = None;
        Ok(())
    }
}
