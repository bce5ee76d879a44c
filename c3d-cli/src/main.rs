use anyhow::{ensure, Context, Result};
use c3d::CaptureDataset;
use log::*;
use structopt::StructOpt;

use std::fs;
use std::path::PathBuf;

mod descriptor;
mod plot;
mod table;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "c3d",
    about = "converts C3D motion capture recordings to CSV and plots marker trajectories"
)]
struct Opt {
    /// Input C3D file
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// Output CSV path; defaults to the input with a .csv extension
    #[structopt(parse(from_os_str))]
    output: Option<PathBuf>,

    /// Marker to plot
    #[structopt(short, long)]
    marker: Option<String>,

    /// Plot output path; defaults to the CSV with a .png extension
    #[structopt(long, parse(from_os_str))]
    plot: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();

    info!("starting up");

    let config: descriptor::Config = match fs::read_to_string("./config.toml") {
        Ok(data) => match toml::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                error!("Failed to parse config file: {}", e);
                Default::default()
            }
        },
        Err(_) => Default::default(),
    };

    let opt = Opt::from_args();

    let data = fs::read(&opt.input).context("failed to open c3d file")?;
    let dataset = CaptureDataset::read(&data).context("failed to decode c3d file")?;

    info!("decoded {}:\n{}", opt.input.display(), dataset.summary());

    let csv_path = opt
        .output
        .clone()
        .or(config.output)
        .unwrap_or_else(|| opt.input.with_extension("csv"));
    table::write_table_file(&dataset, &csv_path)?;
    info!("wrote table to {}", csv_path.display());

    if let Some(marker) = opt.marker.or(config.marker) {
        ensure!(
            dataset.marker_index(&marker).is_some(),
            "marker `{}` is not in this recording",
            marker
        );
        let png = opt.plot.unwrap_or_else(|| csv_path.with_extension("png"));
        let file = fs::File::open(&csv_path).context("failed to reopen table")?;
        let series = plot::load_marker_series(file, dataset.rate, &marker)?;
        plot::render(&series, &marker, &png, (config.plot.width, config.plot.height))?;
        info!("wrote plot to {}", png.display());
    }

    Ok(())
}
