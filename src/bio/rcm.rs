use crate::bio::fasta::{open_reader, open_writer};
use crate::{RepquastError, Result};
use indexmap::IndexMap;
use std::io::{BufRead, Write};
use std::path::Path;

/// Read-to-cluster map. `None` marks an unassigned read.
///
/// Insertion order is preserved so that derived label vectors and files are
/// reproducible across runs.
pub type Rcm = IndexMap<String, Option<String>>;

/// Parse an RCM file: one `<read_id>\t<cluster>` per line, or a bare
/// `<read_id>` for unassigned reads.
pub fn parse_rcm<P: AsRef<Path>>(path: P) -> Result<Rcm> {
    let reader = open_reader(path.as_ref())?;
    let mut rcm = Rcm::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        match line.split_once('\t') {
            Some((id, cluster)) => {
                let id = id.trim();
                if id.is_empty() {
                    return Err(RepquastError::MalformedInput(format!(
                        "RCM line with empty read id: {line:?}"
                    )));
                }
                let cluster = cluster.trim();
                let cluster = if cluster.is_empty() {
                    None
                } else {
                    Some(cluster.to_string())
                };
                rcm.insert(id.to_string(), cluster);
            }
            None => {
                rcm.insert(line.trim().to_string(), None);
            }
        }
    }

    Ok(rcm)
}

/// Write an RCM file in the same format `parse_rcm` accepts.
pub fn write_rcm<P: AsRef<Path>>(rcm: &Rcm, path: P) -> Result<()> {
    let mut writer = open_writer(path.as_ref())?;
    for (id, cluster) in rcm {
        match cluster {
            Some(cluster) => writeln!(writer, "{id}\t{cluster}")?,
            None => writeln!(writer, "{id}")?,
        }
    }
    writer.flush()?;
    Ok(())
}

/// Number of reads per assigned cluster. Unassigned reads are not counted.
pub fn cluster_sizes(rcm: &Rcm) -> IndexMap<String, usize> {
    let mut sizes = IndexMap::new();
    for cluster in rcm.values().flatten() {
        *sizes.entry(cluster.clone()).or_insert(0) += 1;
    }
    sizes
}
