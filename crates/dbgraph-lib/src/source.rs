//! Sequence sources feeding the graph builder
//!
//! Reads FASTA or FASTQ files with transparent gzip decompression, or serves
//! reads from memory. Quality strings are ignored and symbols are not
//! validated here; the extractor skips windows over anything outside the
//! alphabet.
//!
//! A source hands each worker its own share of the input: worker `rank` of
//! `size` sees exactly the records whose index is congruent to `rank`
//! modulo `size`.

use anyhow::{Context, Result};
use needletail::{parse_fastx_file, FastxReader};
use std::path::{Path, PathBuf};

/// One read: identifier and raw sequence bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    /// Record identifier (header up to the end of line)
    pub id: String,
    /// Sequence bytes as stored in the input
    pub sequence: Vec<u8>,
}

impl SequenceRecord {
    /// Create a record
    pub fn new(id: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        Self { id: id.into(), sequence: sequence.into() }
    }
}

/// Iterator over one worker's share of a source
pub type ReadIter<'a> = Box<dyn Iterator<Item = Result<SequenceRecord>> + 'a>;

/// A collection of reads that several workers can consume concurrently
pub trait SequenceSource: Sync {
    /// Open the reads assigned to worker `rank` of `size`
    ///
    /// # Errors
    /// Returns error if the underlying input cannot be opened
    fn reads(&self, rank: usize, size: usize) -> Result<ReadIter<'_>>;
}

/// Reads from a FASTA/FASTQ file (may be gzipped)
///
/// Every worker opens and parses the whole file and keeps only its own
/// records, so parsing cost grows with the number of workers. A zero-byte
/// file is an empty source.
#[derive(Debug, Clone)]
pub struct FastxSource {
    path: PathBuf,
}

impl FastxSource {
    /// Source backed by the file at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Path of the input file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SequenceSource for FastxSource {
    fn reads(&self, rank: usize, size: usize) -> Result<ReadIter<'_>> {
        // needletail refuses zero-byte input
        if std::fs::metadata(&self.path).is_ok_and(|meta| meta.len() == 0) {
            return Ok(Box::new(std::iter::empty()));
        }

        // needletail automatically handles gzip decompression
        let reader = parse_fastx_file(&self.path)
            .with_context(|| format!("Failed to open sequence file: {}", self.path.display()))?;

        Ok(Box::new(FastxReads {
            reader,
            path: &self.path,
            index: 0,
            rank,
            size: size.max(1),
        }))
    }
}

struct FastxReads<'a> {
    reader: Box<dyn FastxReader>,
    path: &'a Path,
    index: usize,
    rank: usize,
    size: usize,
}

impl Iterator for FastxReads<'_> {
    type Item = Result<SequenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(record) = self.reader.next() {
            let index = self.index;
            self.index += 1;

            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    return Some(Err(anyhow::Error::new(e).context(format!(
                        "Failed to parse sequence record {} in {}",
                        index,
                        self.path.display()
                    ))))
                }
            };
            if index % self.size != self.rank {
                continue;
            }
            return Some(Ok(SequenceRecord {
                id: String::from_utf8_lossy(record.id()).into_owned(),
                sequence: record.seq().into_owned(),
            }));
        }
        None
    }
}

/// Reads held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<SequenceRecord>,
}

impl MemorySource {
    /// Source over the given records
    pub fn new(records: Vec<SequenceRecord>) -> Self {
        Self { records }
    }

    /// Source over bare sequences, named `read0`, `read1`, ...
    pub fn from_sequences<I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let records = sequences
            .into_iter()
            .enumerate()
            .map(|(i, seq)| SequenceRecord::new(format!("read{i}"), seq.as_ref()))
            .collect();
        Self { records }
    }

    /// Number of reads
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if there are no reads
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SequenceSource for MemorySource {
    fn reads(&self, rank: usize, size: usize) -> Result<ReadIter<'_>> {
        let size = size.max(1);
        Ok(Box::new(
            self.records
                .iter()
                .skip(rank)
                .step_by(size)
                .cloned()
                .map(Ok::<_, anyhow::Error>),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn collect(
        source: &dyn SequenceSource,
        rank: usize,
        size: usize,
    ) -> Result<Vec<SequenceRecord>> {
        source.reads(rank, size)?.collect()
    }

    #[test]
    fn test_parse_fasta_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, ">seq1")?;
        writeln!(temp_file, "ACGT")?;
        writeln!(temp_file, ">seq2")?;
        writeln!(temp_file, "TGCA")?;
        temp_file.flush()?;

        let source = FastxSource::new(temp_file.path());
        let records = collect(&source, 0, 1)?;

        assert_eq!(
            records,
            vec![SequenceRecord::new("seq1", "ACGT"), SequenceRecord::new("seq2", "TGCA")]
        );
        Ok(())
    }

    #[test]
    fn test_parse_fastq_keeps_invalid_symbols() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "@r1")?;
        writeln!(temp_file, "ACGNNT")?;
        writeln!(temp_file, "+")?;
        writeln!(temp_file, "IIIIII")?;
        temp_file.flush()?;

        let records = collect(&FastxSource::new(temp_file.path()), 0, 1)?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sequence, b"ACGNNT");
        Ok(())
    }

    #[test]
    fn test_fastx_round_robin_partition() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        for i in 0..7 {
            writeln!(temp_file, ">s{}", i)?;
            writeln!(temp_file, "ACGTACGT")?;
        }
        temp_file.flush()?;
        let source = FastxSource::new(temp_file.path());

        let ids = |rank| -> Result<Vec<String>> {
            Ok(collect(&source, rank, 3)?.into_iter().map(|r| r.id).collect())
        };
        assert_eq!(ids(0)?, vec!["s0", "s3", "s6"]);
        assert_eq!(ids(1)?, vec!["s1", "s4"]);
        assert_eq!(ids(2)?, vec!["s2", "s5"]);
        Ok(())
    }

    #[test]
    fn test_empty_file_has_no_reads() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let source = FastxSource::new(temp_file.path());

        assert!(collect(&source, 0, 1)?.is_empty());
        assert!(collect(&source, 1, 3)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let source = FastxSource::new("/nonexistent/reads.fa");
        let err = source.reads(0, 1).err().unwrap();
        assert!(err.to_string().contains("Failed to open sequence file"));
    }

    #[test]
    fn test_memory_source_partition() -> Result<()> {
        let source = MemorySource::from_sequences(["AAAA", "CCCC", "GGGG", "TTTT", "ACGT"]);
        assert_eq!(source.len(), 5);

        let mut seen = Vec::new();
        for rank in 0..2 {
            for record in collect(&source, rank, 2)? {
                seen.push(record.id);
            }
        }
        assert_eq!(seen, vec!["read0", "read2", "read4", "read1", "read3"]);
        assert!(collect(&source, 4, 5)?.iter().all(|r| r.id == "read4"));
        Ok(())
    }
}
