use std::path::PathBuf;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use yang_compiler::{loader, CompilerConfig, DependencyInfo, ModuleGraph, Reactor};

#[derive(Parser)]
#[command(name = "yang-check")]
#[command(about = "Compile a directory of YANG modules and report the result")]
struct Cli {
    /// Directory containing YANG sources (defaults to current directory)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Configuration file (defaults to yangc.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Write the module dependency graph in DOT format to this file
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Print a JSON summary instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CompilerConfig::load_from(cli.config.as_deref())?;
    let dir = cli.dir.unwrap_or_else(|| PathBuf::from("."));

    let sources = loader::load_from_directory(&dir, &config.loader)?;
    if !cli.json {
        println!("Loaded {} sources from {:?}", sources.len(), dir);
    }

    if let Some(dot_path) = &cli.dot {
        let infos = sources
            .iter()
            .map(|s| yang_compiler::parser::parse_source(s).and_then(|ir| DependencyInfo::from_ir(&ir)))
            .collect::<Result<Vec<_>, _>>()?;
        let graph = ModuleGraph::build(&infos)?;
        std::fs::write(dot_path, graph.to_dot())?;
        if !cli.json {
            println!("✅ Exported DOT to: {:?}", dot_path);
        }
    }

    let model = match Reactor::new(&config).add_sources(sources).build() {
        Ok(model) => model,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let runtime = model.runtime_types();
    if cli.json {
        let modules: Vec<_> = model
            .modules()
            .iter()
            .map(|m| {
                serde_json::json!({
                    "name": m.name,
                    "revision": m.revision.as_ref().map(|r| r.as_str()),
                    "namespace": m.namespace.namespace.as_ref(),
                    "yang_version": m.yang_version.as_str(),
                    "checksum": m.checksum.as_str(),
                    "submodules": m.submodules.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                })
            })
            .collect();
        let summary = serde_json::json!({
            "bundle_hash": model.bundle_hash().as_str(),
            "modules": modules,
            "schema_nodes": runtime.schema_nodes.len(),
            "unused_groupings": runtime.unused_groupings.len(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for module in model.modules() {
            println!("  {}", module.identifier());
        }
        println!(
            "✅ Compiled {} modules: {} schema nodes, {} unused groupings",
            model.modules().len(),
            runtime.schema_nodes.len(),
            runtime.unused_groupings.len()
        );
    }
    Ok(())
}
