pub mod csv_exporter;
pub mod results_writer;

pub use csv_exporter::CsvExporter;
pub use results_writer::{load_results, read_json, ResultsWriter};
