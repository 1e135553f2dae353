pub mod csv_parser;
pub mod header_parser;
pub mod timestamp;
