//! Data storage module

pub mod log_writer;

pub use log_writer::SampleLog;
