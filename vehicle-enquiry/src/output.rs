use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use log::info;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use shared::data::VehicleRecord;
use thiserror::Error;

/// Fields shown in the summary, in display order, with their labels. Anything
/// else in a record only shows up in the JSON and CSV renderings.
pub const CANONICAL_FIELDS: [(&str, &str); 20] = [
    ("registrationNumber", "Registration Number"),
    ("make", "Make"),
    ("colour", "Colour"),
    ("yearOfManufacture", "Year of Manufacture"),
    ("engineCapacity", "Engine Capacity (cc)"),
    ("fuelType", "Fuel Type"),
    ("co2Emissions", "CO2 Emissions"),
    ("taxStatus", "Tax Status"),
    ("taxDueDate", "Tax Due Date"),
    ("motStatus", "MOT Status"),
    ("motExpiryDate", "MOT Expiry Date"),
    ("wheelplan", "Wheelplan"),
    ("monthOfFirstRegistration", "Month of First Registration"),
    ("typeApproval", "Type Approval"),
    ("revenueWeight", "Revenue Weight (kg)"),
    ("euroStatus", "Euro Status"),
    ("realDrivingEmissions", "Real Driving Emissions"),
    ("dateOfLastV5CIssued", "Date of Last V5C Issued"),
    ("markedForExport", "Marked For Export"),
    ("artEndDate", "ART End Date"),
];

const BANNER_WIDTH: usize = 50;
const TITLE: &str = "DVLA VEHICLE ENQUIRY RESULTS";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Could not write '{}'. {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not serialize to JSON. {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not write CSV. {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV output was not valid UTF-8. {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// How a record is written to the terminal or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Json,
    Csv,
}

impl OutputFormat {
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized.
    pub fn render(self, record: &VehicleRecord) -> Result<String, OutputError> {
        match self {
            OutputFormat::Summary => Ok(render_summary(record)),
            OutputFormat::Json => render_json(record),
            OutputFormat::Csv => render_csv(record),
        }
    }
}

/// The labelled, human readable view of the canonical fields.
#[must_use]
pub fn render_summary(record: &VehicleRecord) -> String {
    let banner = "=".repeat(BANNER_WIDTH);
    let mut lines = vec![banner.clone(), TITLE.to_string(), banner.clone()];

    lines.extend(CANONICAL_FIELDS.iter().filter_map(|(key, label)| {
        record
            .get(key)
            .filter(|value| !value.is_null())
            .map(|value| format!("{label}: {value}"))
    }));

    lines.push(banner);
    lines.join("\n")
}

/// The whole record as JSON, indented by four spaces.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String, OutputError> {
    let mut buffer = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Two columns, `Field,Value`, one row per field in record order.
///
/// # Errors
///
/// Returns an error if the CSV writer fails.
pub fn render_csv(record: &VehicleRecord) -> Result<String, OutputError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Field", "Value"])?;
    for (key, value) in record.iter() {
        writer.write_record([key, value.to_string().as_str()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// `vehicle_<REG>_<YYYYMMDD_HHMMSS>.<extension>`
#[must_use]
pub fn default_filename(registration: &str, extension: &str, at: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!(
        "vehicle_{registration}_{}.{extension}",
        at.format(TIMESTAMP_FORMAT)
    ))
}

/// The registration number used for default filenames: the one the registry
/// returned if there is one, otherwise the one that was asked for. Only plain
/// alphanumeric values are used so the name cannot point at another directory.
fn filename_registration<'a>(record: &'a VehicleRecord, queried: &'a str) -> &'a str {
    [record.registration_number(), Some(queried)]
        .into_iter()
        .flatten()
        .find(|candidate| is_safe_filename_part(candidate))
        .unwrap_or("unknown")
}

fn is_safe_filename_part(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Writes the record as JSON to `path`, or to a default filename when no path is
/// given, and returns the path written.
///
/// # Errors
///
/// Returns an error if the record cannot be serialized or the file written.
pub fn save_json(
    record: &VehicleRecord,
    path: Option<&Path>,
    queried: &str,
) -> Result<PathBuf, OutputError> {
    save(record, OutputFormat::Json, path, queried, "json")
}

/// Writes the record as `Field,Value` CSV. See [`save_json`].
///
/// # Errors
///
/// Returns an error if the record cannot be serialized or the file written.
pub fn save_csv(
    record: &VehicleRecord,
    path: Option<&Path>,
    queried: &str,
) -> Result<PathBuf, OutputError> {
    save(record, OutputFormat::Csv, path, queried, "csv")
}

fn save(
    record: &VehicleRecord,
    format: OutputFormat,
    path: Option<&Path>,
    queried: &str,
    extension: &str,
) -> Result<PathBuf, OutputError> {
    let path = path.map_or_else(
        || default_filename(filename_registration(record, queried), extension, Local::now()),
        Path::to_path_buf,
    );
    let contents = format.render(record)?;
    write_file(&path, &contents)?;
    info!("Saved {format:?} output to {}", path.display());
    Ok(path)
}

fn write_file(path: &Path, contents: &str) -> Result<(), OutputError> {
    fs::write(path, contents).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}
