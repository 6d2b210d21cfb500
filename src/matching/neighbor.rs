use crate::{RepquastError, Result};
use std::io::BufRead;
use std::path::Path;

/// Parsed neighbor relation between a query set and a target set.
///
/// `fwd[i]` lists `(target, distance)` neighbors of query `i`; `rev[j]`
/// lists `(query, distance)` neighbors of target `j`. Both sides are
/// 0-based; the on-disk format is 1-based.
#[derive(Debug, Clone)]
pub struct NeighborIndex {
    pub fwd: Vec<Vec<(usize, u32)>>,
    pub rev: Vec<Vec<(usize, u32)>>,
    pub query_abundances: Vec<u64>,
}

impl NeighborIndex {
    /// Parse a neighbor file produced by the external matcher.
    ///
    /// The header is `<n_q> <E> <FORMAT>`; each of the following `n_q` rows
    /// is `<abundance> <t1> <d1> <t2> <d2> ...`.
    pub fn parse_file(path: &Path, n_targets: usize, tau_max: u32) -> Result<Self> {
        let reader = crate::bio::fasta::open_reader(path)?;
        Self::parse(reader, n_targets, tau_max)
    }

    pub fn parse<R: BufRead>(reader: R, n_targets: usize, tau_max: u32) -> Result<Self> {
        let mut lines = reader.lines();

        let header = lines
            .next()
            .ok_or_else(|| malformed("empty neighbor file"))?
            .map_err(RepquastError::Io)?;
        let fields: Vec<u64> = header
            .split_whitespace()
            .map(|tok| tok.parse::<u64>().map_err(|_| malformed_header(&header)))
            .collect::<Result<_>>()?;
        if fields.len() != 3 {
            return Err(malformed_header(&header));
        }
        let n_queries = fields[0] as usize;

        let mut fwd = Vec::with_capacity(n_queries);
        let mut rev = vec![Vec::new(); n_targets];
        let mut query_abundances = Vec::with_capacity(n_queries);

        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let i = fwd.len();
            if i >= n_queries {
                return Err(malformed(&format!(
                    "neighbor file declares {n_queries} queries but has more rows"
                )));
            }

            let tokens: Vec<u64> = line
                .split_whitespace()
                .map(|tok| {
                    tok.parse::<u64>()
                        .map_err(|_| malformed(&format!("bad neighbor row: {line:?}")))
                })
                .collect::<Result<_>>()?;

            let (abundance, pairs) = tokens
                .split_first()
                .ok_or_else(|| malformed("empty neighbor row"))?;
            if pairs.len() % 2 != 0 {
                return Err(malformed(&format!(
                    "odd number of neighbor tokens in row {}",
                    i + 1
                )));
            }

            query_abundances.push(*abundance);

            let mut neighbors = Vec::with_capacity(pairs.len() / 2);
            for pair in pairs.chunks_exact(2) {
                let target = pair[0] as usize;
                let distance = pair[1];
                if target == 0 || target > n_targets {
                    return Err(malformed(&format!(
                        "target index {target} out of range 1..={n_targets}"
                    )));
                }
                if distance > u64::from(tau_max) {
                    return Err(malformed(&format!(
                        "distance {distance} exceeds tau_max {tau_max}"
                    )));
                }
                let distance = distance as u32;
                neighbors.push((target - 1, distance));
                rev[target - 1].push((i, distance));
            }
            fwd.push(neighbors);
        }

        if fwd.len() != n_queries {
            return Err(malformed(&format!(
                "neighbor file declares {} queries but has {} rows",
                n_queries,
                fwd.len()
            )));
        }

        Ok(Self {
            fwd,
            rev,
            query_abundances,
        })
    }
}

fn malformed(msg: &str) -> RepquastError {
    RepquastError::MalformedInput(msg.to_string())
}

fn malformed_header(header: &str) -> RepquastError {
    malformed(&format!("bad neighbor file header: {header:?}"))
}
