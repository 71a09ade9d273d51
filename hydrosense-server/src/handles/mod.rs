mod ws_handle;

pub use ws_handle::*;
