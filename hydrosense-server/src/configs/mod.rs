mod settings;

pub use settings::{Logger, Notify, Server, Settings, Tank, Transport, TransportKind};
