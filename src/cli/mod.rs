//! Command-line interface for rust_degsea

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::Result;
use crate::io::{ContrastSpec, Protocol};

#[derive(Parser)]
#[command(name = "rust_degsea")]
#[command(version)]
#[command(about = "RNA-seq differential expression with enrichment tool exports")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline
    #[command(
        long_about = "Run the full pipeline\n\n\
            Loads counts and class labels, filters low-expression and unannotated genes,\n\
            tests every contrast with a negative binomial likelihood ratio test and writes\n\
            significant-gene lists, .rnk rank files, result tables, an annotated expression\n\
            table and a .cls file into the output directory.",
        after_long_help = "\
Examples:
  # Default contrasts (first group vs second, then each group vs rest)
  rust_degsea run -c counts.tsv -l classes.tsv -o results/

  # Explicit contrasts and group order
  rust_degsea run -c counts.tsv -l classes.tsv -o results/ \\
    --group-order Mesenchymal,Immunoreactive,Proliferative,Differentiated \\
    --contrast Mesenchymal-Immunoreactive --contrast Proliferative-rest

  # Protocol file with descriptions and a heatmap
  rust_degsea run -c counts.tsv -l classes.tsv -o results/ -p protocol.json \\
    --annotation symbols.tsv --heatmap"
    )]
    Run(RunArgs),

    /// Filter the count matrix only
    #[command(
        long_about = "Filter the count matrix only.\n\n\
            Keeps genes with CPM above the threshold in enough samples and drops\n\
            unannotated identifiers ('?' or LOC prefix). Writes raw counts.",
        after_long_help = "\
Examples:
  rust_degsea filter -c counts.tsv -o filtered.tsv --min-samples 3"
    )]
    Filter {
        /// Path to count matrix file
        #[arg(short, long)]
        counts: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// CPM a gene must exceed [default: 1]
        #[arg(long, default_value = "1.0")]
        cpm_threshold: f64,

        /// Samples that must pass the CPM threshold [default: 50]
        #[arg(long, default_value = "50")]
        min_samples: usize,

        /// Keep '?' and LOC identifiers
        #[arg(long)]
        keep_unannotated: bool,
    },

    /// Filter and write TMM-normalized CPM
    #[command(
        long_about = "Filter, then write counts per million over TMM-scaled library sizes.",
        after_long_help = "\
Examples:
  rust_degsea normalize -c counts.tsv -o cpm.tsv --min-samples 3"
    )]
    Normalize {
        /// Path to count matrix file
        #[arg(short, long)]
        counts: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// CPM a gene must exceed [default: 1]
        #[arg(long, default_value = "1.0")]
        cpm_threshold: f64,

        /// Samples that must pass the CPM threshold [default: 50]
        #[arg(long, default_value = "50")]
        min_samples: usize,
    },

    /// Write the .cls class label file only
    #[command(
        long_about = "Write the .cls class label file for a count matrix and class table.\n\n\
            Labels follow the count matrix column order.",
        after_long_help = "\
Examples:
  rust_degsea cls -c counts.tsv -l classes.tsv -o classes.cls"
    )]
    Cls {
        /// Path to count matrix file
        #[arg(short, long)]
        counts: PathBuf,

        /// Path to class table file
        #[arg(short = 'l', long)]
        classes: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Class table column holding the labels
        #[arg(long)]
        label_column: Option<String>,

        /// Group order, comma separated
        #[arg(long, value_delimiter = ',')]
        group_order: Vec<String>,
    },
}

/// Options of the `run` subcommand.
///
/// Unset options keep the protocol file value (or its default).
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to count matrix file
    #[arg(short, long,
        long_help = "Path to count matrix file.\n\
            Tab-delimited, quoted fields allowed. First column = gene ids of the form\n\
            SYMBOL|ACCESSION, remaining columns = counts per sample.")]
    pub counts: PathBuf,

    /// Path to class table file
    #[arg(short = 'l', long,
        long_help = "Path to class table file.\n\
            Tab-delimited. First column = sample ids matching the count matrix\n\
            columns, remaining columns = sample annotations.")]
    pub classes: PathBuf,

    /// Output directory (created if missing)
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Protocol JSON file
    #[arg(short, long)]
    pub protocol: Option<PathBuf>,

    /// Class table column holding the labels [default: first column]
    #[arg(long)]
    pub label_column: Option<String>,

    /// CPM a gene must exceed [default: 1]
    #[arg(long)]
    pub cpm_threshold: Option<f64>,

    /// Samples that must pass the CPM threshold [default: 50]
    #[arg(long)]
    pub min_samples: Option<usize>,

    /// FDR cutoff for the significant-gene lists [default: 0.05]
    #[arg(short, long)]
    pub alpha: Option<f64>,

    /// Contrast to test, A-B or A-rest
    #[arg(long, value_name = "A-B",
        long_help = "Contrast to test. Can be given multiple times.\n\
            A-B:    group A against group B\n\
            A-rest: group A against the mean of all other groups\n\
            Without this, the first group is compared with the second, and with\n\
            more than two groups every group is also compared with the rest.")]
    pub contrast: Vec<String>,

    /// Group order, comma separated [default: sorted labels]
    #[arg(long, value_delimiter = ',')]
    pub group_order: Vec<String>,

    /// Symbol/description table for the expression file
    #[arg(long)]
    pub annotation: Option<PathBuf>,

    /// Annotation table tried once when the first cannot be loaded
    #[arg(long)]
    pub annotation_fallback: Option<PathBuf>,

    /// Statistics backend [default: nb-lrt]
    #[arg(long)]
    pub backend: Option<String>,

    /// Backend tried once when the first is unavailable
    #[arg(long)]
    pub backend_fallback: Option<String>,

    /// Draw a heatmap of significant genes
    #[arg(long)]
    pub heatmap: bool,

    /// Contrast drawn in the heatmap [default: first contrast]
    #[arg(long, value_name = "NAME")]
    pub heatmap_contrast: Option<String>,

    /// Number of threads (0 = auto) [default: 0]
    #[arg(short = 't', long, default_value = "0")]
    pub threads: usize,
}

impl RunArgs {
    /// Load the protocol file (or defaults) and apply the command-line overrides
    pub fn protocol(&self) -> Result<Protocol> {
        let mut protocol = match &self.protocol {
            Some(path) => Protocol::from_json_file(path)?,
            None => Protocol::default(),
        };
        self.apply_to(&mut protocol)?;
        Ok(protocol)
    }

    pub fn apply_to(&self, protocol: &mut Protocol) -> Result<()> {
        if let Some(col) = &self.label_column {
            protocol.label_column = Some(col.clone());
        }
        if let Some(v) = self.cpm_threshold {
            protocol.cpm_threshold = v;
        }
        if let Some(v) = self.min_samples {
            protocol.min_samples = v;
        }
        if let Some(v) = self.alpha {
            protocol.alpha = v;
        }
        if !self.contrast.is_empty() {
            protocol.contrasts = self
                .contrast
                .iter()
                .map(|c| c.parse::<ContrastSpec>())
                .collect::<Result<Vec<_>>>()?;
        }
        if !self.group_order.is_empty() {
            protocol.group_order = self.group_order.clone();
        }
        if let Some(path) = &self.annotation {
            protocol.annotation = Some(path.clone());
        }
        if let Some(path) = &self.annotation_fallback {
            protocol.annotation_fallback = Some(path.clone());
        }
        if let Some(name) = &self.backend {
            protocol.backend = name.clone();
        }
        if let Some(name) = &self.backend_fallback {
            protocol.backend_fallback = Some(name.clone());
        }
        if self.heatmap || self.heatmap_contrast.is_some() {
            protocol.heatmap.enabled = true;
        }
        if let Some(name) = &self.heatmap_contrast {
            protocol.heatmap.contrast = Some(name.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_run(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["rust_degsea", "run", "-c", "counts.tsv", "-l", "classes.tsv", "-o", "out"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Some(Commands::Run(args)) => args,
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn test_run_defaults_keep_protocol() {
        let args = parse_run(&[]);
        let mut protocol = Protocol::default();
        args.apply_to(&mut protocol).unwrap();
        assert_eq!(protocol, Protocol::default());
        assert_eq!(args.threads, 0);
    }

    #[test]
    fn test_run_overrides() {
        let args = parse_run(&[
            "--min-samples",
            "3",
            "--alpha",
            "0.1",
            "--contrast",
            "B-A",
            "--contrast",
            "C-rest",
            "--group-order",
            "C,B,A",
            "--heatmap-contrast",
            "B_vs_A",
        ]);
        let mut protocol = Protocol::default();
        args.apply_to(&mut protocol).unwrap();

        assert_eq!(protocol.min_samples, 3);
        assert_eq!(protocol.alpha, 0.1);
        assert_eq!(protocol.cpm_threshold, 1.0);
        assert_eq!(
            protocol.contrasts,
            vec![ContrastSpec::pairwise("B", "A"), ContrastSpec::one_vs_rest("C")]
        );
        assert_eq!(protocol.group_order, vec!["C", "B", "A"]);
        assert!(protocol.heatmap.enabled);
        assert_eq!(protocol.heatmap.contrast.as_deref(), Some("B_vs_A"));
    }

    #[test]
    fn test_bad_contrast_text() {
        let args = parse_run(&["--contrast", "nodash"]);
        assert!(args.apply_to(&mut Protocol::default()).is_err());
    }

    #[test]
    fn test_cls_subcommand() {
        let cli = Cli::try_parse_from([
            "rust_degsea",
            "-v",
            "cls",
            "-c",
            "counts.tsv",
            "-l",
            "classes.tsv",
            "-o",
            "out.cls",
            "--group-order",
            "b,a",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Cls { group_order, .. }) => assert_eq!(group_order, vec!["b", "a"]),
            _ => panic!("expected cls subcommand"),
        }
    }
}
