use std::path::Path;

use log::info;

use crate::{TimeTrialError, leaderboard::Record};

/// Write `records` to `file` as JSON Lines, one record per line
pub fn export_records<'a>(
    file: &Path,
    records: impl IntoIterator<Item = &'a Record>,
) -> Result<usize, TimeTrialError> {
    let records: Vec<&Record> = records.into_iter().collect();
    serde_jsonlines::write_json_lines(file, &records)
        .map_err(|e| TimeTrialError::Export { source: e })?;
    info!("Exported {} records to {:?}", records.len(), file);
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::LevelId;
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_one_line_per_record() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.jsonl");
        let records = vec![
            Record::new(LevelId(1), 12.5, "Ann"),
            Record::new(LevelId(2), 5.0, "Cy"),
        ];

        let written = export_records(&path, &records).unwrap();
        assert_eq!(written, 2);

        let read_back = serde_jsonlines::json_lines(&path)
            .unwrap()
            .collect::<Result<Vec<Record>, std::io::Error>>()
            .unwrap();
        assert_eq!(read_back, records);
    }
}
