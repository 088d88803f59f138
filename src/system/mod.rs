//! 平台/进程级设施

pub mod logging;

pub use logging::init_logging;
