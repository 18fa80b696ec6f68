pub mod csv_sink;
pub mod fetcher;
pub mod parser;
pub mod sheets;

pub use csv_sink::{CsvSink, read_raw, write_raw};
pub use fetcher::ReqwestFetcher;
pub use parser::CatalogParser;
pub use sheets::{SheetsConfig, SheetsSink, values_payload};
