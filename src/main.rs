use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use log::{info, warn};
use nhanes_cohort::{Pipeline, StudyConfig};

const USAGE: &str = "usage: nhanes-cohort <config.json | diet-periodontitis | older-men> [data-dir] [output-dir]";

fn study_config(source: &str, data_dir: Option<&str>) -> anyhow::Result<StudyConfig> {
    match source {
        "diet-periodontitis" => Ok(StudyConfig::diet_periodontitis(data_dir.unwrap_or("data"))),
        "older-men" => Ok(StudyConfig::older_men_health_days(data_dir.unwrap_or("data"))),
        path => {
            let mut config = StudyConfig::from_json_file(Path::new(path))
                .with_context(|| format!("Failed to load study configuration from {path}"))?;
            // A data directory on the command line wins over the file
            if let Some(dir) = data_dir {
                config.loader.data_dir = PathBuf::from(dir);
            }
            Ok(config)
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(source) = args.first() else {
        bail!(USAGE);
    };

    let mut config = study_config(source, args.get(1).map(String::as_str))?;
    if let Some(output) = args.get(2) {
        config.output_dir = Some(PathBuf::from(output));
    }
    if config.output_dir.is_none() {
        warn!("No output directory configured, results are only logged");
    }

    info!("{config}");
    let start = Instant::now();
    let pipeline = Pipeline::new(config).context("Invalid study configuration")?;
    let report = pipeline.run().context("Study run failed")?;

    println!("{report}");
    info!("Study completed in {:?}", start.elapsed());
    Ok(())
}
