//! Packet traversal and evaluation.
//!
//! `packets` splits the record set, `pipeline` evaluates packets under a
//! concurrency cap and merges the results, `funder` layers variable
//! extraction and resolution on top.

pub mod funder;
pub mod packets;
pub mod pipeline;

pub use funder::{resolve_vars, FunderEvaluation, FunderEvaluator, FunderResearch};
pub use packets::{partition, MatchMode, Packet, QueryFilter};
pub use pipeline::{EvaluationReport, Evaluator, PacketPipeline};
