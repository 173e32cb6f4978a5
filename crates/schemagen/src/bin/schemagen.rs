use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use schemagen::{load_entities, register_entities, EntityRegistry, Emitter, GenConfig};

/// Generate source files for schema entities from templates.
#[derive(Parser, Debug)]
#[command(name = "schemagen", version, about)]
struct Cli {
    /// Entity description file (YAML, or JSON with a .json extension)
    entities: PathBuf,

    /// YAML config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory, or output file with --single-file
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Write all entities to one file
    #[arg(long)]
    single_file: bool,

    /// Suffix for per-entity files
    #[arg(short = 'f', long)]
    suffix: Option<String>,

    /// Package name (defaults to the output directory name)
    #[arg(short, long)]
    package: Option<String>,

    /// Overwrite existing files
    #[arg(long)]
    overwrite: bool,

    /// Append to existing files
    #[arg(short, long)]
    append: bool,

    /// Directory of templates overriding the bundled ones
    #[arg(long)]
    template_path: Option<PathBuf>,

    /// Database loader type, e.g. postgres, mysql, sqlite3, oci8
    #[arg(short, long)]
    loader: Option<String>,

    /// Template file extension
    #[arg(long)]
    template_ext: Option<String>,

    /// Do not run the formatter on written files
    #[arg(long)]
    skip_format: bool,

    /// Formatter command; the file path is passed as its last argument
    #[arg(long)]
    formatter: Option<String>,

    /// Do not generate the shared database boilerplate
    #[arg(long)]
    skip_boilerplate: bool,
}

impl Cli {
    fn gen_config(&self) -> anyhow::Result<GenConfig> {
        let mut config = match &self.config {
            Some(path) => GenConfig::from_yaml_file(path)?,
            None => GenConfig::default(),
        };

        if let Some(out) = &self.out {
            config.out = Some(out.clone());
        }
        if let Some(suffix) = &self.suffix {
            config.suffix = suffix.clone();
        }
        if let Some(package) = &self.package {
            config.package = Some(package.clone());
        }
        if let Some(dir) = &self.template_path {
            config.template_path = Some(dir.clone());
        }
        if let Some(loader) = &self.loader {
            config.loader_type = loader.clone();
        }
        if let Some(ext) = &self.template_ext {
            config.template_ext = ext.clone();
        }
        if let Some(formatter) = &self.formatter {
            config.formatter = formatter.clone();
        }
        config.single_file |= self.single_file;
        config.overwrite |= self.overwrite;
        config.append |= self.append;
        config.skip_format |= self.skip_format;
        config.skip_boilerplate |= self.skip_boilerplate;

        Ok(config)
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("could not determine current directory")?;
    let config = cli.gen_config()?.resolve(&cwd)?;
    tracing::debug!(?config, "resolved configuration");

    let entities = load_entities(&cli.entities)?;
    let mut registry = EntityRegistry::new(Arc::new(config.template_set()));
    register_entities(&mut registry, &entities)?;

    let report = Emitter::new(config).run(&mut registry)?;
    for path in &report.skipped {
        eprintln!("skipped {} (exists)", path.display());
    }
    for path in &report.written {
        println!("{}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schemagen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
