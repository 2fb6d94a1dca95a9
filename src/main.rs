//! rust_degsea command-line interface

use std::path::Path;

use clap::Parser;
use log::{info, LevelFilter};

use rust_degsea::cli::{Cli, Commands, RunArgs};
use rust_degsea::export::CLS_FILE;
use rust_degsea::io::write_matrix;
use rust_degsea::normalization::normalized_cpm;
use rust_degsea::prelude::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Find the first non-flag argument (potential subcommand)
    let first_positional = args.iter().skip(1).find(|a| !a.starts_with('-'));
    let subcommands = ["run", "filter", "normalize", "cls", "help"];
    let has_subcommand = first_positional.map_or(false, |a| subcommands.contains(&a.as_str()));

    if !has_subcommand {
        if args.len() == 1 {
            print_no_args();
            return;
        }
        if args.iter().any(|a| a == "--help") {
            print_long_help();
            return;
        }
        if args.iter().any(|a| a == "-h") {
            print_short_help();
            return;
        }
        if args.iter().any(|a| a == "-V" || a == "--version") {
            println!("rust_degsea {}", VERSION);
            return;
        }
        print_no_args();
        return;
    }

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Some(Commands::Run(args)) => run_analysis(&args),
        Some(Commands::Filter {
            counts,
            output,
            cpm_threshold,
            min_samples,
            keep_unannotated,
        }) => {
            let params = FilterParams {
                cpm_threshold,
                min_samples,
                drop_unannotated: !keep_unannotated,
            };
            run_filter(&counts, &output, &params)
        }
        Some(Commands::Normalize {
            counts,
            output,
            cpm_threshold,
            min_samples,
        }) => {
            let params = FilterParams {
                cpm_threshold,
                min_samples,
                ..Default::default()
            };
            run_normalize(&counts, &output, &params)
        }
        Some(Commands::Cls {
            counts,
            classes,
            output,
            label_column,
            group_order,
        }) => {
            let protocol = Protocol {
                label_column,
                group_order,
                ..Default::default()
            };
            run_cls(&counts, &classes, &output, &protocol)
        }
        None => {
            print_no_args();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Custom help output
// ---------------------------------------------------------------------------

fn print_no_args() {
    println!("rust_degsea v{}", VERSION);
    println!("Run `rust_degsea -h` for usage or `rust_degsea --help` for detailed information.");
}

fn print_short_help() {
    println!("rust_degsea v{}", VERSION);
    println!();
    println!("Usage: rust_degsea <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  run        Run the full pipeline");
    println!("  filter     Filter the count matrix only");
    println!("  normalize  Write TMM-normalized CPM");
    println!("  cls        Write the .cls class label file only");
    println!();
    println!("Run `rust_degsea <COMMAND> -h` for command-specific options.");
}

fn print_long_help() {
    println!("rust_degsea v{}", VERSION);
    println!("RNA-seq differential expression with exports for pre-ranked enrichment tools");
    println!();
    println!("Usage: rust_degsea <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  run        Run the full pipeline");
    println!("               - CPM and identifier filtering");
    println!("               - TMM normalization, negative binomial dispersion estimation");
    println!("               - Likelihood ratio test per contrast, BH-adjusted FDR");
    println!("               - Significant-gene lists, .rnk rank files, .cls file");
    println!("               - Annotated expression table, optional SVG heatmap");
    println!("  filter     Filter the count matrix by CPM and identifier");
    println!("  normalize  Write TMM-normalized CPM of the filtered matrix");
    println!("  cls        Write the .cls class label file only");
    println!();
    println!("Global Options:");
    println!("  -v, --verbose    Enable verbose output");
    println!("  -h               Print short help");
    println!("      --help       Print detailed help");
    println!("  -V, --version    Print version");
    println!();
    println!("Examples:");
    println!("  rust_degsea run -c counts.tsv -l classes.tsv -o results/");
    println!();
    println!("  rust_degsea run -c counts.tsv -l classes.tsv -o results/ \\");
    println!("    --contrast Mesenchymal-Immunoreactive --contrast Proliferative-rest --heatmap");
    println!();
    println!("  rust_degsea cls -c counts.tsv -l classes.tsv -o classes.cls");
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn run_analysis(args: &RunArgs) -> Result<()> {
    // Configure thread pool
    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
            .ok();
    }

    let protocol = args.protocol()?;
    let inputs = RunInputs::new(&args.counts, &args.classes, &args.output_dir);
    let report = run_pipeline(&inputs, &protocol)?;

    println!("\n{}", report.filter);
    for summary in &report.contrasts {
        println!("{}", summary);
    }
    info!("{} files written to {}", report.outputs.len(), args.output_dir.display());
    Ok(())
}

fn run_filter(counts_path: &Path, output_path: &Path, params: &FilterParams) -> Result<()> {
    info!("Loading count matrix from: {}", counts_path.display());
    let counts = read_count_matrix(counts_path)?;
    info!("  {} genes, {} samples", counts.n_genes(), counts.n_samples());

    let (filtered, summary) = filter_genes(&counts, params)?;

    info!("Writing filtered counts to: {}", output_path.display());
    write_matrix(output_path, filtered.counts(), filtered.gene_ids(), filtered.sample_ids())?;

    println!("\n{}", summary);
    Ok(())
}

fn run_normalize(counts_path: &Path, output_path: &Path, params: &FilterParams) -> Result<()> {
    info!("Loading count matrix from: {}", counts_path.display());
    let counts = read_count_matrix(counts_path)?;
    info!("  {} genes, {} samples", counts.n_genes(), counts.n_samples());

    let (filtered, _) = filter_genes(&counts, params)?;

    info!("Estimating TMM normalization factors...");
    let factors = tmm_factors(filtered.counts(), &TmmParams::default())?;
    for (sample, f) in filtered.sample_ids().iter().zip(&factors.factors) {
        log::debug!("  {}: {:.4}", sample, f);
    }
    let cpm = normalized_cpm(filtered.counts(), &factors.effective_library_sizes())?;

    info!("Writing normalized CPM to: {}", output_path.display());
    write_matrix(output_path, cpm.view(), filtered.gene_ids(), filtered.sample_ids())?;

    info!("Done!");
    Ok(())
}

fn run_cls(counts_path: &Path, classes_path: &Path, output_path: &Path, protocol: &Protocol) -> Result<()> {
    let (_, classes) = load_inputs(counts_path, classes_path, protocol)?;

    let output = if output_path.is_dir() {
        output_path.join(CLS_FILE)
    } else {
        output_path.to_path_buf()
    };
    info!("Writing class labels to: {}", output.display());
    write_cls(&output, &classes)?;

    info!("Done!");
    Ok(())
}
