//! Significant-gene symbol lists

use std::io::Write;
use std::path::Path;

use super::write_text;
use crate::error::Result;
use crate::io::ContrastResult;

/// One symbol per line for every gene with FDR strictly below `alpha`.
///
/// No header, result order, duplicate symbols kept. Returns the number of lines.
pub fn write_significant_genes<P: AsRef<Path>>(path: P, result: &ContrastResult, alpha: f64) -> Result<usize> {
    let symbols = result.significant_symbols(alpha);
    write_text(path.as_ref(), |out| {
        for symbol in &symbols {
            writeln!(out, "{}", symbol)?;
        }
        Ok(())
    })?;
    Ok(symbols.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Contrast;

    #[test]
    fn test_exact_significant_symbols() {
        let contrast = Contrast {
            name: "A_vs_B".to_string(),
            groups: vec!["A".to_string(), "B".to_string()],
            weights: vec![1.0, -1.0],
        };
        let mut result = ContrastResult::new(
            vec![
                "TP53|7157".to_string(),
                "MYC|4609".to_string(),
                "TP53|7157_1".to_string(),
                "EGFR|1956".to_string(),
            ],
            contrast,
        );
        result.padj = vec![0.001, 0.05, 0.049, 0.2];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A_vs_B_allsignificantgenes.txt");
        let n = write_significant_genes(&path, &result, 0.05).unwrap();

        assert_eq!(n, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "TP53\nTP53\n");
    }
}
