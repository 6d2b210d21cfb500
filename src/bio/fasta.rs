use crate::bio::sequence::Sequence;
use crate::{RepquastError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till},
    character::complete::{line_ending, not_line_ending},
    combinator::{eof, map_res, opt},
    sequence::preceded,
    IResult,
};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

fn is_gz(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("gz")
}

/// Open a file as a buffered reader, transparently handling `.gz`.
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if is_gz(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Open a file as a buffered writer, transparently handling `.gz`.
pub fn open_writer(path: &Path) -> Result<Box<dyn Write>> {
    let file = File::create(path)?;
    if is_gz(path) {
        Ok(Box::new(BufWriter::new(GzEncoder::new(
            file,
            Compression::default(),
        ))))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Parse a FASTA header line: `>` then the id token, then an optional
/// description after the first space.
fn parse_header(input: &[u8]) -> IResult<&[u8], (&str, Option<&str>)> {
    let (input, _) = tag(b">")(input)?;
    let (input, id) = map_res(
        take_till(|c: u8| c == b' ' || c == b'\t' || c == b'\n' || c == b'\r'),
        std::str::from_utf8,
    )(input)?;
    let (input, description) = opt(preceded(
        tag(b" "),
        map_res(not_line_ending, std::str::from_utf8),
    ))(input)?;
    let (input, _) = alt((line_ending, eof))(input)?;
    Ok((input, (id, description)))
}

/// Accumulate sequence lines until the next header or end of input,
/// dropping whitespace and upper-casing bases.
fn parse_sequence(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let mut bases = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() && remaining[0] != b'>' {
        let (rest, line) = take_till::<_, _, nom::error::Error<_>>(|c: u8| {
            c == b'\n' || c == b'\r'
        })(remaining)?;
        let (rest, _) = opt(line_ending)(rest)?;

        bases.extend(
            line.iter()
                .filter(|b| !b.is_ascii_whitespace())
                .map(|b| b.to_ascii_uppercase()),
        );

        if rest.len() == remaining.len() {
            // a lone carriage return matches neither branch; step over it
            remaining = &rest[1..];
        } else {
            remaining = rest;
        }
    }

    Ok((remaining, bases))
}

/// Parse one FASTA record.
fn parse_record(input: &[u8]) -> IResult<&[u8], Sequence> {
    let (input, (id, description)) = parse_header(input)?;
    let (input, bases) = parse_sequence(input)?;

    let mut seq = Sequence::new(id.to_string(), bases);
    seq.description = description
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    Ok((input, seq))
}

/// Parse FASTA records from a byte buffer.
pub fn parse_fasta_from_bytes(data: &[u8]) -> Result<Vec<Sequence>> {
    let mut sequences = Vec::new();
    let mut remaining = data;

    loop {
        while !remaining.is_empty() && remaining[0].is_ascii_whitespace() {
            remaining = &remaining[1..];
        }
        if remaining.is_empty() {
            break;
        }
        if remaining[0] != b'>' {
            return Err(RepquastError::MalformedInput(
                "FASTA data before the first '>' header".to_string(),
            ));
        }

        let (rest, seq) = parse_record(remaining).map_err(|_| {
            RepquastError::MalformedInput(format!(
                "failed to parse FASTA record {}",
                sequences.len() + 1
            ))
        })?;
        sequences.push(seq);
        remaining = rest;
    }

    Ok(sequences)
}

/// Parse a FASTA file into sequences (supports `.gz` compression).
pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
    let mut reader = open_reader(path.as_ref())?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    parse_fasta_from_bytes(&data)
}

/// Write sequences as FASTA (gzipped when the path ends in `.gz`).
pub fn write_fasta<P: AsRef<Path>>(path: P, sequences: &[Sequence]) -> Result<()> {
    let mut writer = open_writer(path.as_ref())?;
    for seq in sequences {
        writeln!(writer, "{}", seq.header())?;
        writer.write_all(&seq.sequence)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}
