pub mod alert;
pub mod ingest;
pub mod server;

pub use alert::AlertError;
pub use ingest::IngestError;
pub use server::ServerError;
