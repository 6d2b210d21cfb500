use crate::report::Report;
use std::fmt::Write;

/// Render the report in the fixed text layout.
pub fn render(report: &Report) -> String {
    let mut out = String::new();

    if let Some(rb) = &report.reference_based {
        let _ = writeln!(
            out,
            "Reference-based quality measures (with size threshold = {}):",
            rb.min_size
        );
        let _ = writeln!(
            out,
            "\tSensitivity:\t\t\t\t{:.4} ({} / {})",
            rb.sensitivity, rb.ref2cons, rb.reference_size
        );
        let _ = writeln!(
            out,
            "\tPrecision:\t\t\t\t{:.4} ({} / {})",
            rb.precision, rb.cons2ref, rb.constructed_size
        );
        let _ = writeln!(
            out,
            "\tMultiplicity median rate:\t\t{:.4}",
            rb.reference_vs_constructed_size_median_rate
        );

        if let Some(clustering) = &rb.clustering {
            let _ = writeln!(out, "\tClustering similarity measures:");
            let _ = writeln!(
                out,
                "\t\tJaccard index:\t\t\t{:.4}",
                clustering.jaccard_index
            );
            let _ = writeln!(
                out,
                "\t\tFowlkes-Mallows index:\t\t{:.4}",
                clustering.fowlkes_mallows_index
            );
            let _ = writeln!(out, "\t\tRand index:\t\t\t{:.4}", clustering.rand_index);
            let _ = writeln!(
                out,
                "\t\tAdjusted Rand index:\t\t{:.4}",
                clustering.adjusted_rand_index
            );
            let _ = writeln!(
                out,
                "\t\tReference purity:\t\t{:.4}",
                clustering.reference_purity
            );
            let _ = writeln!(
                out,
                "\t\tConstructed purity:\t\t{:.4}",
                clustering.constructed_purity
            );
        }
        let _ = writeln!(out);
    }

    if let Some(st) = &report.reference_stats {
        let _ = writeln!(out, "Reference repertoire statistics:");
        let _ = writeln!(out, "\tError rate:\t\t\t\t{:.4}", st.error_rate);
        let _ = writeln!(out);
    }

    if let Some(st) = &report.constructed_stats {
        let _ = writeln!(out, "Constructed repertoire statistics:");
        let _ = writeln!(out, "\tError rate:\t\t\t\t{:.4}", st.error_rate);
        if !st.bad_clusters.is_empty() {
            let _ = writeln!(
                out,
                "\tSuspicious clusters:\t\t\t{}",
                st.bad_clusters.join(", ")
            );
        }
        let _ = writeln!(out);
    }

    out
}
