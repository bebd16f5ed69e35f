use crate::electrode::Electrode;
use crate::frame::SignalFrame;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::path::Path;

/// Write the electrode summary table (name, region, kind, position,
/// average voltage) as CSV.
pub fn write_electrode_summary(path: &Path, electrodes: &[Electrode]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "name",
        "region",
        "kind",
        "x",
        "y",
        "z",
        "average_voltage_uv",
    ])?;
    for electrode in electrodes {
        writer.write_record(&[
            electrode.name.clone(),
            electrode.region.to_string(),
            if electrode.is_original {
                "real".to_string()
            } else {
                "interpolated".to_string()
            },
            format!("{:.4}", electrode.position.x),
            format!("{:.4}", electrode.position.y),
            format!("{:.4}", electrode.position.z),
            format!("{:.2}", electrode.voltage),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a signal frame as TSV: one time column plus one column per
/// channel, rows aligned on the shared time base.
pub fn write_frame_tsv(path: &Path, frame: &SignalFrame) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut header = vec!["time".to_string()];
    header.extend(frame.signals.keys().cloned());
    writer.write_record(&header)?;
    for (row, &t) in frame.timestamps.iter().enumerate() {
        let mut record = vec![t.to_string()];
        for samples in frame.signals.values() {
            record.push(samples.get(row).copied().unwrap_or(0.0).to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::electrode::{ElectrodePosition, Region};
    use csv::ReaderBuilder;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn summary_csv_has_one_row_per_electrode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let electrodes = vec![
            Electrode {
                name: "Fp1".to_string(),
                position: ElectrodePosition::new(-0.35, 0.8, 0.15),
                voltage: 31.5,
                is_original: true,
                region: Region::Frontal,
            },
            Electrode {
                name: "PO3".to_string(),
                position: ElectrodePosition::new(-0.4, 0.45, -0.6),
                voltage: 12.25,
                is_original: false,
                region: Region::Parietal,
            },
        ];
        write_electrode_summary(&path, &electrodes).unwrap();

        let mut reader = ReaderBuilder::new().from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert!(headers.iter().any(|h| h == "region"));
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][2], "real");
        assert_eq!(&rows[1][1], "Pariétal");
        assert_eq!(&rows[1][2], "interpolated");
    }

    #[test]
    fn frame_tsv_keeps_rows_aligned_with_timestamps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.tsv");
        let mut signals = BTreeMap::new();
        signals.insert("Cz".to_string(), vec![1.0, 2.0, 3.0]);
        signals.insert("Pz".to_string(), vec![-1.0, -2.0, -3.0]);
        let frame = SignalFrame {
            timestamps: vec![0.0, 0.004, 0.008],
            signals,
            sampling_rate: 250.0,
            duration: 60.0,
        };
        write_frame_tsv(&path, &frame).unwrap();

        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(&path)
            .unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), ["time", "Cz", "Pz"]);
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[1][1], "2");
    }
}
