//! Answer harvesting
//!
//! The record-writer side of the system: it reads question blocks off review
//! pages and stores them as `answer_*` records. The scan engine never calls
//! into this module directly; it only observes the record count through
//! [`RecordStore`](crate::backend::RecordStore).

pub mod archive;
pub mod harvesting_backend;
pub mod questions;

pub use archive::AnswerArchive;
pub use harvesting_backend::HarvestingBackend;
pub use questions::{HarvestedQuestion, extract_questions};
