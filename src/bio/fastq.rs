use crate::bio::fasta::open_reader;
use crate::bio::sequence::Sequence;
use crate::{RepquastError, Result};
use std::io::BufRead;
use std::path::Path;

/// Parse a FASTQ file into sequences (supports `.gz` compression).
///
/// Quality lines are validated for length and discarded; the evaluation
/// engine works on bases only.
pub fn read_fastq<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
    let reader = open_reader(path.as_ref())?;
    parse_fastq(reader)
}

/// Parse FASTQ records from any reader.
pub fn parse_fastq<R: BufRead>(reader: R) -> Result<Vec<Sequence>> {
    let mut sequences = Vec::new();
    let mut lines = reader.lines();

    while let Some(header) = lines.next() {
        let header = header?;
        let header = header.trim_end();
        if header.is_empty() {
            continue;
        }

        let header = header.strip_prefix('@').ok_or_else(|| {
            RepquastError::MalformedInput(format!(
                "FASTQ record does not start with '@': {header}"
            ))
        })?;

        let seq_line = next_record_line(&mut lines, "sequence")?;
        let plus_line = next_record_line(&mut lines, "separator")?;
        let qual_line = next_record_line(&mut lines, "quality")?;

        if !plus_line.starts_with('+') {
            return Err(RepquastError::MalformedInput(format!(
                "FASTQ separator line is not '+': {plus_line}"
            )));
        }
        if seq_line.len() != qual_line.len() {
            return Err(RepquastError::MalformedInput(format!(
                "FASTQ quality length {} does not match sequence length {}",
                qual_line.len(),
                seq_line.len()
            )));
        }

        let (id, description) = match header.split_once(' ') {
            Some((id, desc)) => (id, Some(desc.to_string())),
            None => (header, None),
        };
        let mut seq = Sequence::new(
            id.to_string(),
            seq_line.bytes().map(|b| b.to_ascii_uppercase()).collect(),
        );
        seq.description = description;
        sequences.push(seq);
    }

    Ok(sequences)
}

fn next_record_line<I>(lines: &mut I, what: &str) -> Result<String>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    match lines.next() {
        Some(line) => Ok(line?.trim_end().to_string()),
        None => Err(RepquastError::MalformedInput(format!(
            "truncated FASTQ record: missing {what} line"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_basic_fastq() {
        let data = "@read1 lane=2\nacgt\n+\nIIII\n@read2\nTT\n+read2\nII\n";
        let seqs = parse_fastq(Cursor::new(data)).unwrap();
        assert_eq!(seqs.len(), 2);
        assert_eq!(seqs[0].id, "read1");
        assert_eq!(seqs[0].description.as_deref(), Some("lane=2"));
        assert_eq!(seqs[0].sequence, b"ACGT");
        assert_eq!(seqs[1].sequence, b"TT");
    }

    #[test]
    fn test_quality_length_mismatch() {
        let data = "@read1\nACGT\n+\nII\n";
        let err = parse_fastq(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, RepquastError::MalformedInput(_)));
    }

    #[test]
    fn test_truncated_record() {
        let data = "@read1\nACGT\n";
        let err = parse_fastq(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, RepquastError::MalformedInput(_)));
    }
}
