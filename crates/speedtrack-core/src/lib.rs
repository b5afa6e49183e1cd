pub mod config;
pub mod driver;
pub mod errors;
pub mod import;
pub mod model;
pub mod probe;
pub mod report;
pub mod scheduler;
pub mod signal;
pub mod storage;
