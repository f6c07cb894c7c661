use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::job::BYTES_PER_MB;

/// Porción contigua de líneas del input, acotada por tamaño en bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputChunk {
    pub chunk_id: u32,
    pub lines: Vec<String>,
    /// 0-based, inclusivo
    pub start_line: u64,
    pub end_line: u64,
}

impl fmt::Display for InputChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chunk {}: líneas {}-{} ({} líneas)",
            self.chunk_id,
            self.start_line,
            self.end_line,
            self.lines.len()
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InputSplitter {
    chunk_size_bytes: usize,
}

impl InputSplitter {
    pub fn new(chunk_size_bytes: usize) -> Self {
        Self {
            chunk_size_bytes: chunk_size_bytes.max(1),
        }
    }

    pub fn from_mb(chunk_size_mb: usize) -> Self {
        Self::new(chunk_size_mb.saturating_mul(BYTES_PER_MB))
    }

    pub fn split_file(&self, path: &Path) -> Result<Vec<InputChunk>> {
        if !path.is_file() {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        self.split_reader(BufReader::new(file))
            .map_err(|e| Error::io(path, e))
    }

    /// Arma chunks línea por línea: se corta el chunk actual cuando la
    /// siguiente línea lo haría pasar de `chunk_size_bytes`. Una línea más
    /// grande que el límite queda sola en su propio chunk.
    pub fn split_reader<R: BufRead>(&self, reader: R) -> io::Result<Vec<InputChunk>> {
        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_size = 0usize;
        let mut line_number: u64 = 0;

        for line in reader.lines() {
            let line = line?;
            let line_size = line.len();

            if current_size + line_size > self.chunk_size_bytes && !current.is_empty() {
                chunks.push(Self::close_chunk(
                    chunks.len() as u32,
                    std::mem::take(&mut current),
                    line_number,
                ));
                current_size = 0;
            }

            current.push(line);
            current_size += line_size;
            line_number += 1;
        }

        if !current.is_empty() {
            chunks.push(Self::close_chunk(chunks.len() as u32, current, line_number));
        }

        Ok(chunks)
    }

    fn close_chunk(chunk_id: u32, lines: Vec<String>, next_line: u64) -> InputChunk {
        let start_line = next_line - lines.len() as u64;
        InputChunk {
            chunk_id,
            start_line,
            end_line: next_line - 1,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn split(text: &str, size: usize) -> Vec<InputChunk> {
        InputSplitter::new(size)
            .split_reader(Cursor::new(text.as_bytes()))
            .unwrap()
    }

    #[test]
    fn concatenated_chunks_reproduce_the_input() {
        let lines: Vec<String> = (0..57).map(|i| format!("linea número {i}")).collect();
        let text = lines.join("\n");

        for size in [1, 10, 40, 100, 10_000] {
            let chunks = split(&text, size);
            let rebuilt: Vec<String> = chunks.iter().flat_map(|c| c.lines.clone()).collect();
            assert_eq!(rebuilt, lines, "chunk size {size}");

            // ids densos y rangos contiguos
            let mut expected_start = 0;
            for (i, c) in chunks.iter().enumerate() {
                assert_eq!(c.chunk_id as usize, i);
                assert_eq!(c.start_line, expected_start);
                assert_eq!(c.end_line - c.start_line + 1, c.lines.len() as u64);
                expected_start = c.end_line + 1;
            }
        }
    }

    #[test]
    fn chunks_respect_byte_budget_except_single_long_lines() {
        let text = "aaaa\nbbbb\ncccc\ndddddddddddd\ne";
        let chunks = split(text, 8);

        let sizes: Vec<Vec<&str>> = chunks
            .iter()
            .map(|c| c.lines.iter().map(String::as_str).collect())
            .collect();
        assert_eq!(
            sizes,
            vec![
                vec!["aaaa", "bbbb"],
                vec!["cccc"],
                vec!["dddddddddddd"],
                vec!["e"],
            ]
        );
    }

    #[test]
    fn empty_input_has_no_chunks() {
        assert!(split("", 16).is_empty());
    }

    #[test]
    fn split_file_reports_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let err = InputSplitter::new(16).split_file(&missing).unwrap_err();
        assert!(matches!(err, Error::InputNotFound(p) if p == missing));
    }

    #[test]
    fn split_file_reads_lines_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "a b a").unwrap();
        writeln!(f, "b c").unwrap();

        let chunks = InputSplitter::from_mb(1).split_file(&path).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].lines, vec!["a b a", "b c"]);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (0, 1));
    }
}
