//! Data Transfer Objects for the presentation layer
//!
//! DTOs wrap domain types with the extra context a front end needs to
//! render them. They are serialized as JSON at the boundary.

pub mod deploy;
