//! Full per-contrast result table

use std::io::Write;
use std::path::Path;

use super::ranks::format_score;
use super::write_text;
use crate::data::GeneId;
use crate::error::Result;
use crate::io::ContrastResult;

/// Scientific notation with six decimals, `NA` when missing
pub fn format_pvalue(p: f64) -> String {
    if p.is_nan() {
        "NA".to_string()
    } else {
        format!("{:.6e}", p)
    }
}

/// Columns `GeneName Accession logFC logCPM LR PValue FDR`, one row per tested gene
pub fn write_results_table<P: AsRef<Path>>(path: P, result: &ContrastResult) -> Result<()> {
    write_text(path.as_ref(), |out| {
        writeln!(out, "GeneName\tAccession\tlogFC\tlogCPM\tLR\tPValue\tFDR")?;
        for (i, raw) in result.gene_ids.iter().enumerate() {
            let id = GeneId::parse(raw);
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                id.symbol,
                id.accession,
                format_score(result.log2_fold_changes[i]),
                format_score(result.log_cpm[i]),
                format_score(result.lr_stat[i]),
                format_pvalue(result.pvalues[i]),
                format_pvalue(result.padj[i]),
            )?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Contrast;

    #[test]
    fn test_results_table_columns() {
        let contrast = Contrast {
            name: "A_vs_B".to_string(),
            groups: vec!["A".to_string(), "B".to_string()],
            weights: vec![1.0, -1.0],
        };
        let mut result = ContrastResult::new(vec!["TP53|7157".to_string()], contrast);
        result.log2_fold_changes = vec![1.5];
        result.log_cpm = vec![4.0];
        result.lr_stat = vec![10.0];
        result.pvalues = vec![0.25];
        result.padj = vec![0.5];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A_vs_B_results.tsv");
        write_results_table(&path, &result).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "GeneName\tAccession\tlogFC\tlogCPM\tLR\tPValue\tFDR");
        assert_eq!(lines[1], "TP53\t7157\t1.5\t4\t10\t2.500000e-1\t5.000000e-1");
    }

    #[test]
    fn test_format_pvalue() {
        assert_eq!(format_pvalue(1e-300), "1.000000e-300");
        assert_eq!(format_pvalue(1.0), "1.000000e0");
        assert_eq!(format_pvalue(0.0), "0.000000e0");
        assert_eq!(format_pvalue(f64::NAN), "NA");
    }
}
