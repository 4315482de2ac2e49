// CSV match report

use std::io::Write;
use std::path::Path;

use asbuilt_recon::error::ReconError;
use asbuilt_recon::model::ReportRow;

fn csv_err(e: csv::Error) -> ReconError {
    ReconError::Io(e.to_string())
}

/// Write one header line plus one line per row.
pub fn write_report<W: Write>(rows: &[ReportRow], writer: W) -> Result<(), ReconError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_report_file(rows: &[ReportRow], path: &Path) -> Result<(), ReconError> {
    let file = std::fs::File::create(path)
        .map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))?;
    write_report(rows, std::io::BufWriter::new(file))?;
    log::info!("report written to {} ({} rows)", path.display(), rows.len());
    Ok(())
}
