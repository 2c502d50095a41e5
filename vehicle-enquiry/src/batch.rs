use std::{
    io::{Read, Write},
    thread,
    time::Duration,
};

use indexmap::IndexSet;
use log::{info, warn};
use serde_json::{Map, Value};
use shared::data::{FieldValue, VehicleRecord};
use thiserror::Error;

use crate::{
    client::{RegistryClient, Transport},
    error::RegistryError,
    output::{render_json, OutputError},
};

/// Header keywords that suggest a column holds registration numbers.
const COLUMN_KEYWORDS: [&str; 5] = ["reg", "registration", "vrm", "plate", "number"];
pub const ERROR_COLUMN: &str = "error";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Could not read CSV input. {0}")]
    Csv(#[from] csv::Error),
    #[error("Column '{0}' not found in the CSV file")]
    MissingColumn(String),
    #[error("The CSV file has no columns")]
    NoColumns,
    #[error("Could not write results. {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// The result of one registration in a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// The registration number as it appeared in the input.
    pub registration: String,
    pub result: Result<VehicleRecord, RegistryError>,
}

impl BatchOutcome {
    /// A flat row for output. Failures become `registrationNumber` plus `error`.
    fn to_row(&self) -> Map<String, Value> {
        match &self.result {
            Ok(record) => record
                .iter()
                .map(|(key, value)| (key.to_string(), to_json(value)))
                .collect(),
            Err(err) => {
                let mut row = Map::new();
                row.insert(
                    "registrationNumber".into(),
                    Value::String(self.registration.clone()),
                );
                row.insert(ERROR_COLUMN.into(), Value::String(err.to_string()));
                row
            }
        }
    }
}

fn to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(value) => Value::Bool(*value),
        FieldValue::Number(value) => Value::Number(value.clone()),
        FieldValue::Text(value) => Value::String(value.clone()),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[must_use]
pub fn summarize(outcomes: &[BatchOutcome]) -> Summary {
    let successful = outcomes.iter().filter(|o| o.result.is_ok()).count();
    Summary {
        total: outcomes.len(),
        successful,
        failed: outcomes.len() - successful,
    }
}

/// Reads registration numbers from CSV input.
///
/// With a header row the column is `column` if given, otherwise the first header
/// that looks like a registration column, otherwise the first column. Without a
/// header the first column is used. Empty cells are skipped.
///
/// # Errors
///
/// Returns an error if the CSV is malformed or the named column does not exist.
pub fn read_registrations<R: Read>(
    input: R,
    column: Option<&str>,
    has_header: bool,
) -> Result<Vec<String>, BatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .from_reader(input);

    let index = if has_header {
        let headers = reader.headers()?;
        if headers.is_empty() {
            return Err(BatchError::NoColumns);
        }
        pick_column(headers, column)?
    } else {
        0
    };

    let mut registrations = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        match record.get(index).map(str::trim) {
            Some(value) if !value.is_empty() => registrations.push(value.to_string()),
            _ => warn!(
                "Skipping empty registration number at line {}",
                file_line(&record, row, has_header)
            ),
        }
    }
    Ok(registrations)
}

/// The line of the input file a record came from, counting from 1 and including
/// the header row.
fn file_line(record: &csv::StringRecord, row: usize, has_header: bool) -> u64 {
    record.position().map_or_else(
        || (row + 1 + usize::from(has_header)) as u64,
        csv::Position::line,
    )
}

fn pick_column(headers: &csv::StringRecord, column: Option<&str>) -> Result<usize, BatchError> {
    if let Some(column) = column {
        return headers
            .iter()
            .position(|header| header == column)
            .ok_or_else(|| BatchError::MissingColumn(column.to_string()));
    }

    let detected = headers.iter().position(|header| {
        let header = header.to_lowercase();
        COLUMN_KEYWORDS.iter().any(|keyword| header.contains(keyword))
    });
    match detected {
        Some(index) => {
            info!("Using column '{}' for registration numbers", &headers[index]);
            Ok(index)
        }
        None => {
            info!(
                "No registration column found, using first column: '{}'",
                &headers[0]
            );
            Ok(0)
        }
    }
}

/// Queries every registration in turn through one client, pausing `delay`
/// between consecutive requests. Failures are recorded, not retried.
pub fn process<T: Transport>(
    client: &mut RegistryClient<T>,
    registrations: &[String],
    delay: Duration,
) -> Vec<BatchOutcome> {
    let total = registrations.len();
    let mut outcomes = Vec::with_capacity(total);

    for (index, registration) in registrations.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }
        info!("Processing {}/{total}: {registration}", index + 1);
        outcomes.push(BatchOutcome {
            registration: registration.clone(),
            result: client.query(registration),
        });
    }

    outcomes
}

/// Writes one row per outcome. The columns are every key seen, in first-seen
/// order, with `error` last.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_csv<W: Write>(outcomes: &[BatchOutcome], output: W) -> Result<(), BatchError> {
    let rows: Vec<Map<String, Value>> = outcomes.iter().map(BatchOutcome::to_row).collect();

    let mut columns: IndexSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .filter(|key| *key != ERROR_COLUMN)
        .collect();
    columns.insert(ERROR_COLUMN);

    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&columns)?;
    for row in &rows {
        writer.write_record(columns.iter().map(|column| cell(row.get(*column))))?;
    }
    writer.flush()?;
    Ok(())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Writes the outcomes as a JSON array of flat objects.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(outcomes: &[BatchOutcome], mut output: W) -> Result<(), BatchError> {
    let rows: Vec<Map<String, Value>> = outcomes.iter().map(BatchOutcome::to_row).collect();
    let json = render_json(&rows)?;
    output.write_all(json.as_bytes())?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::{
        client::{ApiKey, ClientConfig, RawResponse},
        error::ErrorKind,
        registration::QueryRequest,
    };

    /// Answers by registration number and remembers what was asked.
    #[derive(Default)]
    struct ScriptedTransport {
        asked: Vec<String>,
    }

    impl Transport for ScriptedTransport {
        fn send(
            &mut self,
            _endpoint: &str,
            _api_key: &ApiKey,
            request: &QueryRequest,
        ) -> Result<RawResponse, RegistryError> {
            let registration = request.registration_number().to_string();
            self.asked.push(registration.clone());
            match registration.as_str() {
                "BAD1" => Ok(RawResponse {
                    status: 429,
                    body: Vec::new(),
                }),
                "DOWN1" => Err(RegistryError::Transport {
                    message: "connection reset".into(),
                }),
                _ => Ok(RawResponse {
                    status: 200,
                    body: format!(r#"{{"registrationNumber":"{registration}"}}"#).into_bytes(),
                }),
            }
        }
    }

    /// Accepts nothing; every write fails.
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn ok(registration: &str, json: &str) -> BatchOutcome {
        BatchOutcome {
            registration: registration.into(),
            result: Ok(serde_json::from_str(json).unwrap()),
        }
    }

    fn failed(registration: &str, err: RegistryError) -> BatchOutcome {
        BatchOutcome {
            registration: registration.into(),
            result: Err(err),
        }
    }

    #[test]
    fn detects_registration_column() {
        let input = "Customer,Vehicle Reg,Notes\nSmith,AB12 XYZ,x\nJones,CD34EFG,y\n";
        let regs = read_registrations(input.as_bytes(), None, true).unwrap();
        assert_eq!(regs, ["AB12 XYZ", "CD34EFG"]);
    }

    #[test]
    fn falls_back_to_first_column() {
        let input = "Owner,Notes\nAB12XYZ,x\n";
        let regs = read_registrations(input.as_bytes(), None, true).unwrap();
        assert_eq!(regs, ["AB12XYZ"]);
    }

    #[test]
    fn named_column_must_exist() {
        let input = "a,b\n1,2\n";
        assert_eq!(
            read_registrations(input.as_bytes(), Some("b"), true).unwrap(),
            ["2"]
        );
        assert!(matches!(
            read_registrations(input.as_bytes(), Some("vrm"), true),
            Err(BatchError::MissingColumn(column)) if column == "vrm"
        ));
    }

    #[test]
    fn headerless_input_uses_first_column_and_skips_blanks() {
        let input = "AB12XYZ,x\n,y\n  \nCD34EFG\n";
        let regs = read_registrations(input.as_bytes(), None, false).unwrap();
        assert_eq!(regs, ["AB12XYZ", "CD34EFG"]);
    }

    #[test]
    fn process_queries_each_registration_once_in_order() {
        let config = ClientConfig::new(ApiKey::new("key").unwrap());
        let mut client = RegistryClient::with_transport(config, ScriptedTransport::default());
        let registrations: Vec<String> = ["ab12 xyz", "BAD1", "  ", "DOWN1", "CD34EFG"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let outcomes = process(&mut client, &registrations, Duration::ZERO);

        assert_eq!(
            outcomes.iter().map(|o| o.registration.as_str()).collect::<Vec<_>>(),
            ["ab12 xyz", "BAD1", "  ", "DOWN1", "CD34EFG"]
        );
        // The blank entry fails locally and never reaches the transport.
        assert_eq!(client.transport().asked, ["AB12XYZ", "BAD1", "DOWN1", "CD34EFG"]);

        assert_eq!(
            outcomes[0].result.as_ref().unwrap().registration_number(),
            Some("AB12XYZ")
        );
        assert_eq!(outcomes[1].result.as_ref().unwrap_err(), &RegistryError::RateLimit);
        assert_eq!(
            outcomes[2].result.as_ref().unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            outcomes[3].result.as_ref().unwrap_err().kind(),
            ErrorKind::Transport
        );
        assert!(outcomes[4].result.is_ok());
        assert_eq!(
            summarize(&outcomes),
            Summary {
                total: 5,
                successful: 2,
                failed: 3
            }
        );
    }

    #[test]
    fn process_pauses_only_between_requests() {
        let config = ClientConfig::new(ApiKey::new("key").unwrap());
        let mut client = RegistryClient::with_transport(config, ScriptedTransport::default());
        let delay = Duration::from_millis(200);

        let started = std::time::Instant::now();
        process(&mut client, &["AB12XYZ".to_string()], delay);
        assert!(started.elapsed() < delay);

        let started = std::time::Instant::now();
        process(&mut client, &["AB12XYZ".to_string(), "CD34EFG".to_string()], delay);
        assert!(started.elapsed() >= delay);
    }

    #[test]
    fn json_write_failures_are_reported() {
        let outcomes = vec![ok("AB12XYZ", r#"{"registrationNumber":"AB12XYZ"}"#)];

        let buffered = io::BufWriter::new(FullDisk);
        assert!(matches!(write_json(&outcomes, buffered), Err(BatchError::Io(_))));
        assert!(write_csv(&outcomes, io::BufWriter::new(FullDisk)).is_err());
    }

    #[test]
    fn skipped_rows_report_their_file_line() {
        let input = "reg,owner\nAB12XYZ,x\n,y\n";
        let mut reader = csv::Reader::from_reader(input.as_bytes());
        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(file_line(&records[1], 1, true), 3);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(",y\n".as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(file_line(&record, 0, false), 1);

        assert_eq!(file_line(&csv::StringRecord::new(), 1, true), 3);
    }

    #[test]
    fn summary_counts() {
        let outcomes = vec![
            ok("AB12XYZ", r#"{"registrationNumber":"AB12XYZ"}"#),
            failed("BAD", RegistryError::RateLimit),
        ];
        assert_eq!(
            summarize(&outcomes),
            Summary {
                total: 2,
                successful: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn csv_columns_are_union_in_first_seen_order() {
        let outcomes = vec![
            ok("AB12XYZ", r#"{"registrationNumber":"AB12XYZ","make":"FORD","engineCapacity":1598}"#),
            failed(
                "zz 99",
                RegistryError::Http {
                    status: 500,
                    body: "boom".into(),
                },
            ),
            ok("CD34EFG", r#"{"registrationNumber":"CD34EFG","colour":"RED","make":"BMW"}"#),
        ];
        let mut buffer = Vec::new();
        write_csv(&outcomes, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "registrationNumber,make,engineCapacity,colour,error");
        assert_eq!(lines[1], "AB12XYZ,FORD,1598,,");
        assert_eq!(lines[2], "zz 99,,,,HTTP error 500: boom");
        assert_eq!(lines[3], "CD34EFG,BMW,,RED,");
    }

    #[test]
    fn json_output_keeps_failures() {
        let outcomes = vec![
            ok("AB12XYZ", r#"{"registrationNumber":"AB12XYZ","markedForExport":false}"#),
            failed("", RegistryError::validation("Registration number must not be empty")),
        ];
        let mut buffer = Vec::new();
        write_json(&outcomes, &mut buffer).unwrap();

        let parsed: Vec<Map<String, Value>> = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["markedForExport"], Value::Bool(false));
        assert_eq!(
            parsed[1]["error"],
            Value::String("Validation error: Registration number must not be empty".into())
        );
        assert_eq!(failed("x", RegistryError::RateLimit).result.unwrap_err().kind(), ErrorKind::RateLimit);
    }
}
