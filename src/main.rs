use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use heapdup::analyze::{
    jvm_boxes, ArrayDuplicates, BoxAnalyzer, InstanceDuplicates, StringScan, DEFAULT_STRING_CLASS,
};
use heapdup::dump::{DumpVisitor, MultiplexingVisitor, SnapshotReader};
use heapdup::layout::{Layouter, MarginalCosts, ModelLayouter};
use heapdup::report;

#[derive(Parser, Debug)]
#[command(name = "heapdup", about = "Find redundant data in heap snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count duplicated scalar-wrapper values and project cache savings.
    Boxes {
        /// Heap snapshot file.
        dump: PathBuf,
    },
    /// Find instances and arrays with identical payload bytes.
    Duplicates {
        /// Heap snapshot file.
        dump: PathBuf,
    },
    /// Find string contents that deduplication could collapse (two passes).
    StringDedup {
        /// Heap snapshot file.
        dump: PathBuf,
        /// Wrapper class holding the string value array.
        #[arg(long, default_value = DEFAULT_STRING_CLASS)]
        string_class: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Boxes { dump } => run_boxes(&dump),
        Commands::Duplicates { dump } => run_duplicates(&dump),
        Commands::StringDedup { dump, string_class } => run_string_dedup(&dump, string_class),
    }
}

fn traverse(path: &Path, visitor: &mut dyn DumpVisitor) -> Result<()> {
    SnapshotReader::open(path)
        .with_context(|| format!("failed to open snapshot {}", path.display()))?
        .parse(visitor)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    Ok(())
}

fn run_boxes(dump: &Path) -> Result<()> {
    let layouter = ModelLayouter::new();
    let costs = MarginalCosts::measure(&layouter);

    println!("Heap Dump: {}", dump.display());

    let mut analyzers: Vec<BoxAnalyzer> = jvm_boxes()
        .into_iter()
        .map(|class| BoxAnalyzer::new(class, costs))
        .collect();
    {
        let mut mv = MultiplexingVisitor::new();
        for analyzer in &mut analyzers {
            mv.add(analyzer);
        }
        traverse(dump, &mut mv)?;
    }

    println!();
    println!("{}", layouter.describe());
    println!();

    let mut verbose = String::new();
    let mut autobox = String::new();
    let mut manual = String::new();
    let mut discard = String::new();
    let mut discard2 = String::new();

    for analyzer in &analyzers {
        analyzer.report(&layouter, &mut verbose, &mut discard, &mut discard2);
    }
    for analyzer in analyzers.iter().filter(|a| a.is_cache_candidate()) {
        analyzer.report(&layouter, &mut discard, &mut autobox, &mut manual);
    }

    print!("{verbose}");
    print!("{autobox}");
    print!("{manual}");
    Ok(())
}

fn run_duplicates(dump: &Path) -> Result<()> {
    let layouter = ModelLayouter::new();

    println!("Heap Dump: {}", dump.display());

    let mut instances = InstanceDuplicates::new();
    let mut arrays = ArrayDuplicates::new();
    {
        let mut mv = MultiplexingVisitor::new();
        mv.add(&mut instances);
        mv.add(&mut arrays);
        traverse(dump, &mut mv)?;
    }

    println!();
    println!("{}", layouter.describe());
    println!();

    let mut blocks = instances.compute(&layouter);
    blocks.extend(arrays.compute(&layouter));
    for block in report::rank_blocks(blocks) {
        print!("{block}");
    }
    Ok(())
}

fn run_string_dedup(dump: &Path, string_class: String) -> Result<()> {
    let layouter = ModelLayouter::new();

    println!("Heap Dump: {}", dump.display());

    println!();
    println!("Discovering {string_class} objects...");
    let mut scan = StringScan::new(string_class);
    traverse(dump, &mut scan)?;

    println!();
    println!("Discovering string contents...");
    let mut values = scan.into_value_scan();
    traverse(dump, &mut values)?;

    println!();
    println!("{}", layouter.describe());
    println!();

    print!("{}", values.report(&layouter));
    Ok(())
}
