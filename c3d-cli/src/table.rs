use anyhow::{Context, Result};
use c3d::CaptureDataset;

use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the dataset as a delimited table: a leading frame-index column,
/// then `<label>_X`, `<label>_Y`, `<label>_Z` per marker, one row per frame.
/// Occluded samples serialize as NaN.
pub fn write_table<W: Write>(dataset: &CaptureDataset, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["Frame".to_string()];
    for label in &dataset.labels {
        header.push(format!("{}_X", label));
        header.push(format!("{}_Y", label));
        header.push(format!("{}_Z", label));
    }
    writer.write_record(&header)?;

    for (frame, row) in dataset.frames().enumerate() {
        let mut record = vec![frame.to_string()];
        for [x, y, z] in row {
            record.push(x.to_string());
            record.push(y.to_string());
            record.push(z.to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_table_file(dataset: &CaptureDataset, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_table(dataset, file)
}
