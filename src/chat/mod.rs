//! Query answering: prompt templating, generation, provenance.

pub mod generator;
pub mod prompt;
pub mod provenance;

pub use generator::{AnswerGenerator, AskRequest, GeneratorConfig};
pub use prompt::{variant_index, PromptKind, PromptTemplater, Tone};
pub use provenance::ProvenanceRecorder;
