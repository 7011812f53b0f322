//! Confgate Core
//!
//! Core types shared by every confgate crate.
//!
//! This crate contains:
//! - Domain types: command results, backups, the live configuration document
//!   and deployment outcomes
//! - DTOs: payloads handed to the presentation layer

pub mod domain;
pub mod dto;
