//! Complaint tickets.

pub mod model;
