use persuasion_core::{CoreError, RatingRow, RatingTable, Result, TableSchema, TableSource};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataLoadingConfig {
    pub path: PathBuf,
    pub delimiter: char,
    pub schema: TableSchema,
}

impl Default for DataLoadingConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data.csv"),
            delimiter: ',',
            schema: TableSchema::default(),
        }
    }
}

impl DataLoadingConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_schema(mut self, schema: TableSchema) -> Self {
        self.schema = schema;
        self
    }
}

/// Reads the ratings table from a CSV export of the survey sheet.
pub struct CsvTableLoader {
    config: DataLoadingConfig,
}

impl CsvTableLoader {
    pub fn new(config: DataLoadingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DataLoadingConfig {
        &self.config
    }

    /// Parses CSV text from any reader; the first record is the header.
    pub fn read_from<R: Read>(&self, reader: R) -> Result<RatingTable> {
        if !self.config.delimiter.is_ascii() {
            return Err(CoreError::Validation(format!(
                "delimiter '{}' is not a single-byte character",
                self.config.delimiter
            )));
        }

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.config.delimiter as u8)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| CoreError::Parse(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let schema = self.config.schema.resolve(&headers)?;
        let rate_column = headers[schema.rate_index].clone();
        let decimal_comma = self.config.delimiter != ',';
        let mut rows = Vec::new();

        for (i, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| CoreError::Parse(e.to_string()))?;
            // blank lines are dropped by the reader, so count from the record position
            let sheet_row = record.position().map_or(i + 2, |p| p.line() as usize);

            if record.iter().all(str::is_empty) {
                tracing::debug!(row = sheet_row, "skipping empty row");
                continue;
            }

            let scores = schema
                .principle_indices
                .iter()
                .zip(&schema.principle_names)
                .map(|(&col, name)| {
                    let cell = record.get(col).unwrap_or("");
                    parse_number(cell, decimal_comma).ok_or_else(|| {
                        CoreError::Parse(format!(
                            "row {}: '{}' is not a number in column '{}'",
                            sheet_row, cell, name
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            let mut row = RatingRow::new(scores).at_sheet_row(sheet_row);

            if let Some(label) = record.get(schema.method_index).filter(|l| !l.is_empty()) {
                row = row.with_method(label);
            }

            let rate_cell = record.get(schema.rate_index).unwrap_or("");
            if !rate_cell.is_empty() {
                let rate = parse_number(rate_cell, decimal_comma).ok_or_else(|| {
                    CoreError::Parse(format!(
                        "row {}: compromise rate '{}' is not a number",
                        sheet_row, rate_cell
                    ))
                })?;
                row = row.with_rate(rate);
            }

            rows.push(row);
        }

        tracing::info!(
            rows = rows.len(),
            principles = schema.principle_names.len(),
            "loaded ratings table"
        );

        Ok(RatingTable::new(schema.principle_names, rows)?.with_rate_column(rate_column))
    }
}

impl TableSource for CsvTableLoader {
    fn load(&self) -> Result<RatingTable> {
        tracing::info!(path = %self.config.path.display(), "reading ratings");
        let file = std::fs::File::open(&self.config.path).map_err(|e| {
            CoreError::Io(format!("{}: {}", self.config.path.display(), e))
        })?;
        self.read_from(file)
    }
}

fn parse_number(cell: &str, decimal_comma: bool) -> Option<f64> {
    let cell = cell.trim();
    let value = if decimal_comma {
        cell.replace(',', ".").parse::<f64>().ok()?
    } else {
        cell.parse::<f64>().ok()?
    };
    value.is_finite().then_some(value)
}
