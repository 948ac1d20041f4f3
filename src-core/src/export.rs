//! Report and download file contents.

use crate::analysis::AnalysisData;
use crate::error::KaleError;
use crate::history::HistoryRecord;

pub const REPORT_FILE_NAME: &str = "analysis_report.csv";

/// Download name for a background-removed image.
pub const SEGMENTED_FILE_NAME: &str = "background_removed_image.png";

pub const REPORT_MIME: &str = "text/csv;charset=utf-8";

/// Two-line CSV report: header then values. Fields are quoted by the csv
/// writer when they contain separators or quotes.
pub fn report_csv(file_name: &str, data: &AnalysisData) -> Result<String, KaleError> {
    let mut header = vec!["File Name".to_string(), "Percentage Weight Loss".to_string()];
    header.extend(data.features.keys().cloned());

    let mut row = vec![
        file_name.to_string(),
        format!("{:.2}%", data.percentage_weight_loss),
    ];
    row.extend(data.features.values().map(|v| format!("{:.2}", v)));

    two_line_csv(&header, &row)
}

/// Download name for one history record's report.
pub fn record_file_name(id: &str) -> String {
    format!("analysis_{}.csv", id)
}

/// Report for a saved history record. Same layout as [`report_csv`] with
/// the record's date and time after the file name.
pub fn record_csv(record: &HistoryRecord) -> Result<String, KaleError> {
    let (date, time) = record.display_time();

    let mut header = vec![
        "File Name".to_string(),
        "Date".to_string(),
        "Time".to_string(),
        "Percentage Weight Loss".to_string(),
    ];
    header.extend(record.features.keys().cloned());

    let mut row = vec![
        record.image_name.clone(),
        date,
        time,
        format!("{:.2}%", record.percentage_weight_loss),
    ];
    row.extend(record.features.values().map(|v| format!("{:.2}", v)));

    two_line_csv(&header, &row)
}

fn two_line_csv(header: &[String], row: &[String]) -> Result<String, KaleError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(header)
        .and_then(|_| writer.write_record(row))
        .map_err(|e| KaleError::Storage(format!("Failed to write CSV: {}", e)))?;

    let bytes = writer
        .into_inner()
        .map_err(|e| KaleError::Storage(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| KaleError::Storage(format!("CSV is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Features;
    use chrono::{TimeZone, Utc};

    fn data(features: Features) -> AnalysisData {
        AnalysisData {
            percentage_weight_loss: 12.3456,
            features,
            image_url: None,
        }
    }

    #[test]
    fn test_two_lines_with_all_columns() {
        let features = Features::from([
            ("mean_green".to_string(), 101.5),
            ("contrast".to_string(), 0.256),
            ("area".to_string(), 3.0),
        ]);
        let csv = report_csv("kale.png", &data(features)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "File Name,Percentage Weight Loss,area,contrast,mean_green");
        assert_eq!(lines[1], "kale.png,12.35%,3.00,0.26,101.50");
    }

    #[test]
    fn test_no_features() {
        let csv = report_csv("kale.png", &data(Features::new())).unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(csv.as_bytes());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.len() == 2));
    }

    #[test]
    fn test_commas_in_names_are_quoted() {
        let features = Features::from([("a,b".to_string(), 1.0)]);
        let csv = report_csv("leaf, side.jpg", &data(features)).unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(csv.as_bytes());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records[0].len(), 3);
        assert_eq!(&records[0][2], "a,b");
        assert_eq!(&records[1][0], "leaf, side.jpg");
    }

    #[test]
    fn test_record_report_has_date_and_time() {
        let record = HistoryRecord {
            id: "65f1a2b3c4d5e6f708192a3b".to_string(),
            timestamp: Some(Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap()),
            image_name: "kale.jpg".to_string(),
            image_url: "/fallback-image.jpg".to_string(),
            percentage_weight_loss: 9.5,
            features: Features::from([("mean_green".to_string(), 90.0)]),
        };
        let csv = record_csv(&record).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "File Name,Date,Time,Percentage Weight Loss,mean_green",
                "kale.jpg,2026-03-14,15:09,9.50%,90.00",
            ]
        );
        assert_eq!(
            record_file_name(&record.id),
            "analysis_65f1a2b3c4d5e6f708192a3b.csv"
        );
    }

    #[test]
    fn test_record_report_without_timestamp() {
        let record = HistoryRecord {
            id: "history_1".to_string(),
            timestamp: None,
            image_name: "kale.png".to_string(),
            image_url: String::new(),
            percentage_weight_loss: 0.0,
            features: Features::new(),
        };
        let csv = record_csv(&record).unwrap();
        assert_eq!(csv.lines().nth(1), Some("kale.png,Unknown,Unknown,0.00%"));
    }
}
