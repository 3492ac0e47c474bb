//! Proto Reconstruction CLI
//!
//! Loads a definition bundle, resolves the target modules and writes the
//! reconstructed proto3 document below the output directory.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use proto_reconstruct::codegen::{generate, Generator};
use proto_reconstruct::{load_bundle, ReconConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proto-recon")]
#[command(about = "Reconstruct a proto3 schema from reflected RPC descriptors")]
struct Cli {
    /// Directory the document is written under
    out_dir: PathBuf,

    /// Definition bundle file or directory (overrides the config file)
    #[arg(short, long)]
    bundle: Option<PathBuf>,

    /// Explicit config file
    #[arg(short, long)]
    config: Option<String>,

    /// Target module; repeat for several (overrides the config file)
    #[arg(short, long = "target")]
    targets: Vec<String>,

    /// Package name for the document header
    #[arg(short, long)]
    package: Option<String>,

    /// Also write the module dependency graph in DOT format
    #[arg(long)]
    graph: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match cli.config.as_deref() {
        Some(path) => ReconConfig::load_from(Some(path)),
        None => ReconConfig::load(),
    }
    .context("loading configuration")?;
    if !cli.targets.is_empty() {
        config.targets.modules = cli.targets;
    }
    if cli.package.is_some() {
        config.output.package = cli.package;
    }

    let Some(bundle) = cli.bundle.or(config.input.bundle.clone()) else {
        bail!("no definition bundle given; pass --bundle or set input.bundle");
    };

    let definitions = load_bundle(&bundle)?;
    println!("Loaded {} definitions from {}", definitions.len(), bundle.display());

    let mut generator = Generator::new(definitions).with_numbering(config.render.enum_numbering);
    let result = generate(&mut generator, &config.targets.modules, &config.output);

    // diagnostics are useful even when generation failed part way
    let diagnostics = generator.diagnostics();
    if !diagnostics.is_empty() {
        eprintln!("{}", diagnostics.format_all());
    }

    let document = result?;
    let path = document.write_to(&cli.out_dir)?;

    if let Some(graph_path) = &cli.graph {
        std::fs::write(graph_path, generator.modules().to_dot())
            .with_context(|| format!("writing {}", graph_path.display()))?;
        println!("Wrote module graph to {}", graph_path.display());
    }

    let modules = generator.modules();
    for cycle in modules.cycles() {
        println!("Dependency cycle: {}", cycle.join(" -> "));
    }

    let registries = generator.registries();
    println!();
    println!("Summary:");
    println!("  Modules resolved: {}", modules.module_count());
    println!("  Services:         {}", registries.services.len());
    println!("  Messages:         {}", registries.types.len());
    println!("  Enums:            {}", registries.enums.len());
    println!(
        "  Diagnostics:      {} errors, {} warnings",
        diagnostics.error_count(),
        diagnostics.warning_count()
    );
    println!("  Output:           {}", path.display());
    println!("  SHA-256:          {}", document.checksum());

    Ok(())
}
