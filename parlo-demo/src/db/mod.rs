//! Database access for the demo service

pub mod access;
pub mod leads;
pub mod logs;
