//! Pre-ranked gene lists (`.rnk`)

use std::io::Write;
use std::path::Path;

use super::write_text;
use crate::data::gene_symbol;
use crate::error::Result;
use crate::io::ContrastResult;

/// sign(log2FC) * -log10(p).
///
/// A fold change of exactly zero scores zero whatever the p-value; p = 0
/// gives an infinite score.
pub fn rank_score(log2_fold_change: f64, pvalue: f64) -> f64 {
    if log2_fold_change.is_nan() || pvalue.is_nan() {
        return f64::NAN;
    }
    if log2_fold_change == 0.0 {
        return 0.0;
    }
    log2_fold_change.signum() * -pvalue.log10()
}

/// Text form of a score: `Inf`, `-Inf` and `NA` for non-finite values.
/// Negative zero prints as `0`.
pub fn format_score(score: f64) -> String {
    if score.is_nan() {
        "NA".to_string()
    } else if score == f64::INFINITY {
        "Inf".to_string()
    } else if score == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        format!("{}", score + 0.0)
    }
}

/// Header `GeneName\trank`, then one row per gene in result order
pub fn write_rank_file<P: AsRef<Path>>(path: P, result: &ContrastResult) -> Result<()> {
    write_text(path.as_ref(), |out| {
        writeln!(out, "GeneName\trank")?;
        for ((id, &lfc), &p) in result
            .gene_ids
            .iter()
            .zip(&result.log2_fold_changes)
            .zip(&result.pvalues)
        {
            writeln!(out, "{}\t{}", gene_symbol(id), format_score(rank_score(lfc, p)))?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DegseaError;
    use crate::io::Contrast;

    #[test]
    fn test_rank_score_rule() {
        assert!((rank_score(2.5, 0.01) - 2.0).abs() < 1e-12);
        assert!((rank_score(-0.1, 0.001) + 3.0).abs() < 1e-12);
        assert_eq!(rank_score(0.0, 1e-30), 0.0);
        assert_eq!(rank_score(0.0, 0.0), 0.0);
        assert_eq!(rank_score(1.0, 0.0), f64::INFINITY);
        assert_eq!(rank_score(-1.0, 0.0), f64::NEG_INFINITY);
        assert!(rank_score(f64::NAN, 0.5).is_nan());
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(f64::INFINITY), "Inf");
        assert_eq!(format_score(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_score(f64::NAN), "NA");
        assert_eq!(format_score(1.5), "1.5");
        assert_eq!(format_score(-0.0), "0");
        assert_eq!(format_score(rank_score(0.7, 1.0)), "0");
        assert_eq!(format_score(rank_score(-0.7, 1.0)), "0");
    }

    #[test]
    fn test_rank_file_layout() {
        let contrast = Contrast {
            name: "A_vs_rest".to_string(),
            groups: vec!["A".to_string(), "B".to_string()],
            weights: vec![1.0, -1.0],
        };
        let mut result = ContrastResult::new(vec!["TP53|7157".to_string(), "MYC|4609".to_string()], contrast);
        result.log2_fold_changes = vec![1.0, 0.0];
        result.pvalues = vec![0.0, 0.5];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A_vs_rest_ranks.rnk");
        write_rank_file(&path, &result).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "GeneName\trank\nTP53\tInf\nMYC\t0\n"
        );
    }

    #[test]
    fn test_rank_file_unwritable_path() {
        let contrast = Contrast {
            name: "A_vs_B".to_string(),
            groups: vec!["A".to_string(), "B".to_string()],
            weights: vec![1.0, -1.0],
        };
        let result = ContrastResult::new(vec!["TP53|7157".to_string()], contrast);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("A_vs_B_ranks.rnk");
        let err = write_rank_file(&path, &result).unwrap_err();
        assert!(matches!(err, DegseaError::FormatWrite { .. }));
        assert!(!path.exists());
    }
}
