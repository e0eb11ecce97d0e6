use anyhow::{bail, Context, Result};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::trades::TradeRow;

/// One CSV file to produce.
pub struct CsvOutput<'a> {
    pub path: &'a Path,
    pub header: &'a [&'a str],
    pub rows: &'a [TradeRow],
}

/// A fully written temp file waiting to be renamed over its target.
struct StagedCsv<'a> {
    temp_file: NamedTempFile,
    path: &'a Path,
}

impl StagedCsv<'_> {
    fn commit(self) -> Result<()> {
        match self.temp_file.persist(self.path) {
            Ok(_) => Ok(()),
            Err(e) => bail!("Failed to replace {}: {}", self.path.display(), e.error),
        }
    }
}

fn stage<'a>(output: &CsvOutput<'a>) -> Result<StagedCsv<'a>> {
    let dir = match output.path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp_file = tempfile::Builder::new()
        .prefix(".csfloat-export")
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;

    {
        let mut writer = csv::Writer::from_writer(&mut temp_file);
        writer.write_record(output.header).context("Failed to write CSV header")?;
        for row in output.rows {
            writer.write_record(row.to_record())
                .with_context(|| format!("Failed to write trade {}", row.transaction_id))?;
        }
        writer.flush().context("Failed to flush CSV")?;
    }

    Ok(StagedCsv { temp_file, path: output.path })
}

/// Write every output, replacing existing files.
///
/// All CSVs are built in temp files next to their targets first and only
/// then renamed into place, so a failure while writing any of them leaves
/// every previous file as it was.
pub fn write_trades_csvs(outputs: &[CsvOutput<'_>]) -> Result<()> {
    let staged = outputs.iter().map(stage).collect::<Result<Vec<_>>>()?;
    for csv in staged {
        csv.commit()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{PURCHASES_HEADER, SALES_HEADER};
    use std::fs;

    fn write_one(path: &Path, header: &[&str], rows: &[TradeRow]) -> Result<()> {
        write_trades_csvs(&[CsvOutput { path, header, rows }])
    }

    fn row(id: &str, name: &str) -> TradeRow {
        TradeRow {
            item_name: name.to_string(),
            price: "1000".to_string(),
            float: Some(0.23),
            item_type: "Field-Tested".to_string(),
            date: "2024-01-01".to_string(),
            transaction_id: id.to_string(),
        }
    }

    #[test]
    fn test_write_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        write_one(&path, &PURCHASES_HEADER, &[row("abc123", "AK-47 | Redline")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec![
            "item name,price,float,type,date bought,transaction id",
            "AK-47 | Redline,1000,0.23,Field-Tested,2024-01-01,abc123",
        ]);
    }

    #[test]
    fn test_write_quotes_commas_in_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        write_one(&path, &SALES_HEADER, &[row("x", "Sticker | Team, Holo")]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(4), Some("date sold"));
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.get(0), Some("Sticker | Team, Holo"));
    }

    #[test]
    fn test_write_empty_is_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        write_one(&path, &SALES_HEADER, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert_eq!(content.trim_end(), "item name,price,float,type,date sold,transaction id");
    }

    #[test]
    fn test_write_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale contents\nmore\nmore\n").unwrap();

        write_one(&path, &PURCHASES_HEADER, &[]).unwrap();

        assert!(!fs::read_to_string(&path).unwrap().contains("stale"));
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        assert!(write_one(&path, &PURCHASES_HEADER, &[]).is_err());
    }

    #[test]
    fn test_failed_output_leaves_every_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let purchases = dir.path().join("purchases.csv");
        let sales = dir.path().join("missing").join("sales.csv");
        fs::write(&purchases, "previous export\n").unwrap();

        let rows = [row("abc123", "AK-47 | Redline")];
        let result = write_trades_csvs(&[
            CsvOutput { path: &purchases, header: &PURCHASES_HEADER, rows: &rows },
            CsvOutput { path: &sales, header: &SALES_HEADER, rows: &rows },
        ]);

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&purchases).unwrap(), "previous export\n");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let purchases = dir.path().join("purchases.csv");
        let sales = dir.path().join("sales.csv");

        write_trades_csvs(&[
            CsvOutput { path: &purchases, header: &PURCHASES_HEADER, rows: &[row("p", "P")] },
            CsvOutput { path: &sales, header: &SALES_HEADER, rows: &[] },
        ])
        .unwrap();

        assert_eq!(fs::read_to_string(&purchases).unwrap().lines().count(), 2);
        assert_eq!(fs::read_to_string(&sales).unwrap().lines().count(), 1);
    }
}
