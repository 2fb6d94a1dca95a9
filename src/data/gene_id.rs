//! Composite gene identifiers of the form `symbol|accession`

/// Separator between symbol and accession
pub const SEPARATOR: char = '|';

/// Borrowed view of a composite row identifier.
///
/// `symbol` is everything before the first literal `|`; `accession` is the
/// remainder (empty when the identifier has no separator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneId<'a> {
    pub raw: &'a str,
    pub symbol: &'a str,
    pub accession: &'a str,
}

impl<'a> GeneId<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw.split_once(SEPARATOR) {
            Some((symbol, accession)) => Self {
                raw,
                symbol,
                accession,
            },
            None => Self {
                raw,
                symbol: raw,
                accession: "",
            },
        }
    }

    /// Placeholder (`?`) and locus-only (`LOC…`) identifiers carry no curated symbol
    pub fn is_unannotated(&self) -> bool {
        is_unannotated(self.raw)
    }
}

/// True when the identifier contains `?` or starts with `LOC`
pub fn is_unannotated(raw: &str) -> bool {
    raw.contains('?') || raw.starts_with("LOC")
}

/// Symbol portion of a composite identifier
pub fn gene_symbol(raw: &str) -> &str {
    GeneId::parse(raw).symbol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_composite() {
        let id = GeneId::parse("TP53|7157");
        assert_eq!(id.symbol, "TP53");
        assert_eq!(id.accession, "7157");
    }

    #[test]
    fn test_parse_without_separator() {
        let id = GeneId::parse("BRCA1");
        assert_eq!(id.symbol, "BRCA1");
        assert_eq!(id.accession, "");
    }

    #[test]
    fn test_only_first_separator_splits() {
        let id = GeneId::parse("SLC35E2|728661|extra");
        assert_eq!(id.symbol, "SLC35E2");
        assert_eq!(id.accession, "728661|extra");
    }

    #[test]
    fn test_unannotated_patterns() {
        assert!(is_unannotated("?|100130426"));
        assert!(is_unannotated("LOC100128977|100128977"));
        assert!(is_unannotated("ABC?|1"));
        assert!(!is_unannotated("A1BG|1"));
        // LOC must be a prefix
        assert!(!is_unannotated("CLOCK|9575"));
    }
}
