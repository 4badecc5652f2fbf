use clap::Parser;
use paradox_patch::compatibility;
use paradox_patch::flags::{self, StrategyArg};
use paradox_patch::orchestrator::{self, CancellationToken, ProgressReporter, Strategy};
use paradox_patch::scanner;
use paradox_patch::writer;
use std::process;

struct VerboseProgress;

impl ProgressReporter for VerboseProgress {
    fn report(&self, current_file: &str, index: usize, total: usize, status: &str) {
        eprintln!("[{}/{total}] {status}: {current_file}", index + 1);
    }
}

fn main() -> anyhow::Result<()> {
    let args = flags::Args::parse();

    if args.auto_detect {
        eprintln!("--auto-detect is not supported; pass --mods explicitly");
        process::exit(1);
    }

    let (base_dir, submods) = args.base_and_submods()?;

    if args.list_mods {
        list_mods(base_dir, submods);
        return Ok(());
    }

    if args.list_conflicts {
        list_conflicts(base_dir, submods)?;
        return Ok(());
    }

    let output = args.output.clone().ok_or_else(|| anyhow::anyhow!("--output is required"))?;
    let name = args.name.clone().ok_or_else(|| anyhow::anyhow!("--name is required"))?;

    if output.exists() && output.read_dir().map(|mut d| d.next().is_some()).unwrap_or(false) {
        anyhow::bail!("output directory {} already exists and is not empty", output.display());
    }

    let strategy = match args.strategy {
        StrategyArg::Smart => Strategy::Smart,
        StrategyArg::Priority => Strategy::Priority,
        StrategyArg::Base => Strategy::Base,
    };

    let cancel = CancellationToken::default();
    let progress: Box<dyn ProgressReporter> =
        if args.verbose { Box::new(VerboseProgress) } else { Box::new(orchestrator::NullProgress) };

    let (stats, results) = orchestrator::run(base_dir, submods, strategy, progress.as_ref(), &cancel)?;

    let load_order: Vec<String> = submods
        .iter()
        .map(|p| {
            compatibility::load_descriptor(p)
                .ok()
                .flatten()
                .map(|d| d.name)
                .unwrap_or_else(|| p.file_name().and_then(|n| n.to_str()).unwrap_or("mod").to_string())
        })
        .collect();

    writer::write_patch(&output, &name, "1.0", "*", &load_order, &results, &stats)?;

    if args.verbose {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    if stats.failed > 0 {
        process::exit(1);
    }
    Ok(())
}

fn list_mods(base_dir: &std::path::Path, submods: &[std::path::PathBuf]) {
    let base_name = compatibility::load_descriptor(base_dir)
        .ok()
        .flatten()
        .map(|d| d.name)
        .unwrap_or_else(|| "vanilla".to_string());
    println!("base: {base_name}");
    for path in submods {
        let name = compatibility::load_descriptor(path)
            .ok()
            .flatten()
            .map(|d| d.name)
            .unwrap_or_else(|| path.file_name().and_then(|n| n.to_str()).unwrap_or("mod").to_string());
        println!("submod: {name}");
    }
}

fn list_conflicts(base_dir: &std::path::Path, submods: &[std::path::PathBuf]) -> anyhow::Result<()> {
    let scanned = scanner::scan(base_dir, submods)?;
    for path in &scanned {
        let changed_count = path.contributions.iter().filter(|c| !c.unchanged).count();
        if changed_count > 1 {
            println!("{}", path.relative_path);
        }
    }
    Ok(())
}
