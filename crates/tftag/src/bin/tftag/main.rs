mod cli;

use tftag::config::Config;
use tftag::report::{FileReport, Totals};
use tftag::tagger::Tagger;
use tracing_subscriber::filter::LevelFilter;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    let default_level = if cli.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_env_var("TFTAG_LOG")
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    if let Err(e) = run(&cli) {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

fn run(cli: &cli::Cli) -> anyhow::Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| Config::FILE_NAME.into());
    let config = Config::load(&config_path)?;
    tracing::debug!(groups = config.groups().len(), "tag configuration loaded");

    let tagger = Tagger::new(config);
    let reports = tagger.tag_directory(&cli.dir, cli.dry_run)?;

    let totals: Totals = reports.iter().collect();
    tracing::info!(
        files = totals.files,
        changed = totals.changed_files,
        tagged = totals.tagged_blocks,
        skipped = totals.skipped_blocks,
        dry_run = cli.dry_run,
        "done"
    );

    if let Some(format) = cli.format {
        output(format, &reports)?;
    }

    Ok(())
}

fn output(format: cli::OutputFormat, reports: &[FileReport]) -> anyhow::Result<()> {
    match format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), reports)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), reports)?,
    };

    Ok(())
}
