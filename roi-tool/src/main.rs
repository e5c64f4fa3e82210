use anyhow::{Context, Result};
use bbox::prelude::*;
use clap::Parser;
use label::ClassId;
use log::info;
use prettytable::{cell, row, Table};
use roi_target::{assign_images, Bilinear, BoxDelta, ImageRecord, ImageTargets, TargetConfig};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Parser)]
/// Inspect detection target assignment on recorded proposals.
enum Opts {
    /// Assign targets to each image of a JSON sample file.
    Assign {
        /// JSON5 configuration file
        #[clap(long)]
        config: Option<PathBuf>,
        /// JSON file with a list of image records
        #[clap(long)]
        input: PathBuf,
        /// seed of the random sampling
        #[clap(long, default_value = "0")]
        seed: u64,
        /// write a JSON report of the assigned targets to this file
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration.
    ShowConfig {
        /// JSON5 configuration file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_logger();

    match Opts::parse() {
        Opts::Assign {
            config,
            input,
            seed,
            output,
        } => assign(config, input, seed, output)?,
        Opts::ShowConfig { config } => show_config(config)?,
    }

    Ok(())
}

fn init_logger() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn load_config(path: Option<PathBuf>) -> Result<TargetConfig> {
    match path {
        Some(path) => TargetConfig::open(path),
        None => Ok(TargetConfig::default()),
    }
}

fn show_config(config_file: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_file)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn assign(
    config_file: Option<PathBuf>,
    input_file: impl AsRef<Path>,
    seed: u64,
    output_file: Option<PathBuf>,
) -> Result<()> {
    let input_file = input_file.as_ref();
    let config = load_config(config_file)?;

    let records: Vec<ImageRecord> = {
        let reader = BufReader::new(
            File::open(input_file)
                .with_context(|| format!("failed to open '{}'", input_file.display()))?,
        );
        serde_json::from_reader(reader)
            .with_context(|| format!("failed to parse '{}'", input_file.display()))?
    };
    info!("loaded {} image records", records.len());

    let outcomes = assign_images(&records, &config, &Bilinear::default(), seed);

    // print per-image summary
    {
        let mut table = Table::new();
        table.add_row(row!["image", "positive", "negative", "padding", "status"]);

        outcomes.iter().for_each(|outcome| match &outcome.result {
            Ok(batch) => {
                table.add_row(row![
                    outcome.image_id,
                    batch.positive_count(),
                    batch.negative_count(),
                    batch.padding_count(),
                    "ok"
                ]);
            }
            Err(err) => {
                table.add_row(row![outcome.image_id, "-", "-", "-", format!("{:#}", err)]);
            }
        });

        table.printstd();
    }

    let n_failed = outcomes
        .iter()
        .filter(|outcome| outcome.result.is_err())
        .count();
    info!(
        "assigned targets for {} of {} images",
        outcomes.len() - n_failed,
        outcomes.len()
    );

    if let Some(output_file) = output_file {
        let report: Vec<_> = outcomes.iter().map(ImageReport::from).collect();
        let writer = BufWriter::new(
            File::create(&output_file)
                .with_context(|| format!("failed to create '{}'", output_file.display()))?,
        );
        serde_json::to_writer_pretty(writer, &report)?;
        info!("report written to '{}'", output_file.display());
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct ImageReport {
    image_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    positive_count: usize,
    negative_count: usize,
    rois: Vec<[f64; 4]>,
    class_ids: Vec<ClassId>,
    deltas: Vec<BoxDelta>,
    /// The number of foreground pixels in each mask target.
    mask_areas: Vec<usize>,
}

impl From<&ImageTargets> for ImageReport {
    fn from(outcome: &ImageTargets) -> Self {
        match &outcome.result {
            Ok(batch) => Self {
                image_id: outcome.image_id,
                error: None,
                positive_count: batch.positive_count(),
                negative_count: batch.negative_count(),
                rois: batch.rois().iter().map(|roi| roi.tlbr()).collect(),
                class_ids: batch.class_ids().clone(),
                deltas: batch.deltas().clone(),
                mask_areas: batch
                    .samples()
                    .map(|sample| sample.mask.iter().filter(|&&pixel| pixel > 0.0).count())
                    .collect(),
            },
            Err(err) => Self {
                image_id: outcome.image_id,
                error: Some(format!("{:#}", err)),
                positive_count: 0,
                negative_count: 0,
                rois: vec![],
                class_ids: vec![],
                deltas: vec![],
                mask_areas: vec![],
            },
        }
    }
}
