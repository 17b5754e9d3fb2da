pub mod bulk;
pub mod extractor;
pub mod ingest;
pub mod interfaces;
pub mod parser;
pub mod query;
pub mod source;
pub mod store;
