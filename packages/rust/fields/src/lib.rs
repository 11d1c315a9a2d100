//! Deterministic, regex-based field extraction.
//!
//! These are the fallbacks used when no LLM capability is configured or the
//! capability fails: invoice and RFQ fields from PDF text, and CRM fields
//! from email text. Nothing here performs I/O.

mod document;
mod email;

pub use document::{UNKNOWN, extract_amount, extract_document_fields};
pub use email::{EmailFields, Urgency, classify_urgency, extract_email_fields};
