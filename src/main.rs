use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info, warn};

use stablematch::pipeline::workflow::log_summary;
use stablematch::{BatchRunner, GraphLoader, GraphWriter, MatchingConfig, NamedInstance};

const DEFAULT_INSTANCE_DIR: &str = "instances";
const DEFAULT_OUTPUT_DIR: &str = "output";

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

struct CliArgs {
    config: Option<PathBuf>,
    output: PathBuf,
    instances: Vec<PathBuf>,
}

fn parse_args() -> Result<CliArgs> {
    let mut config = None;
    let mut output = PathBuf::from(DEFAULT_OUTPUT_DIR);
    let mut instances = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config expects a path")?;
                config = Some(PathBuf::from(path));
            }
            "--output" => {
                let path = args.next().context("--output expects a directory")?;
                output = PathBuf::from(path);
            }
            flag if flag.starts_with("--") => anyhow::bail!("Unknown flag: {flag}"),
            path => instances.push(PathBuf::from(path)),
        }
    }

    if instances.is_empty() {
        instances = collect_instance_files(Path::new(DEFAULT_INSTANCE_DIR))
            .with_context(|| format!("list instance directory {}", DEFAULT_INSTANCE_DIR))?;
        if instances.is_empty() {
            anyhow::bail!("No instances available under {}", DEFAULT_INSTANCE_DIR);
        }
    }

    Ok(CliArgs {
        config,
        output,
        instances,
    })
}

fn main() -> Result<()> {
    init_logging();
    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => MatchingConfig::from_path(path)?,
        None => MatchingConfig::default(),
    };
    info!(
        "Matching {} instance(s) with policy {:?}, reciprocity {:?}",
        args.instances.len(),
        config.policy,
        config.reciprocity
    );

    let mut named = Vec::with_capacity(args.instances.len());
    for path in &args.instances {
        let graph = GraphLoader::from_path(path)?;
        info!(
            "Instance {}: {} agents, {} relations",
            instance_name(path),
            graph.node_count(),
            graph.relation_count()
        );
        named.push(NamedInstance::new(instance_name(path), graph));
    }
    let graphs: Vec<_> = named.iter().map(|instance| instance.graph.clone()).collect();

    fs::create_dir_all(&args.output)
        .with_context(|| format!("create output directory {:?}", args.output))?;

    let (outcomes, stats) = BatchRunner::new(config).run(named);
    for (outcome, graph) in outcomes.iter().zip(&graphs) {
        let summary = match &outcome.result {
            Ok(summary) => summary,
            Err(err) => {
                error!("Instance {}: {:#}", outcome.name, err);
                continue;
            }
        };
        log_summary(&outcome.name, summary);
        if let Some(report) = summary.stability.as_ref().filter(|r| !r.is_stable) {
            warn!("Instance {}: {}", outcome.name, report.explanation.trim_end());
        }

        let view = summary.view();
        let json_path = args.output.join(format!("{}.json", outcome.name));
        GraphWriter::write_to_path(graph, Some(&view), &json_path)
            .with_context(|| format!("write matching to {:?}", json_path))?;
        let dot_path = args.output.join(format!("{}.dot", outcome.name));
        GraphWriter::write_dot_to_path(graph, Some(&view), &dot_path)
            .with_context(|| format!("write diagram to {:?}", dot_path))?;
    }

    info!(
        "Solved {} instance(s), {} failed, {} pairs, {} proposals in {:?}",
        stats.solved, stats.failed, stats.pairs, stats.proposals, stats.wall_time
    );
    if stats.failed > 0 {
        anyhow::bail!("{} instance(s) could not be matched", stats.failed);
    }
    Ok(())
}

fn instance_name(path: &Path) -> String {
    path.file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("instance")
        .to_string()
}

fn collect_instance_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(OsStr::to_str)
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}
