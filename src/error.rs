use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalesLedgerError {
    #[error("Unsupported file type for '{0}': expected .xlsx, .xls or .csv")]
    UnsupportedFileType(String),

    #[error("File '{0}' is empty")]
    EmptyFile(String),

    #[error("Could not open workbook '{filename}': {details}")]
    Workbook { filename: String, details: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No valid data found in files. Upload POS sales reports (Excel or CSV) or cleaned ledgers.")]
    NoValidData,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SalesLedgerError>;
