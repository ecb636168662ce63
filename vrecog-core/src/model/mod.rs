//! Decode resources: model registry, symbol tables, graphs, speaker model

pub mod acoustic;
pub mod graph;
pub mod registry;
pub mod rescoring;
pub mod speaker;
pub mod symbols;

pub use acoustic::{AcousticModel, AcousticUnit};
pub use graph::{GraphKind, GraphResources, SearchGraph};
pub use registry::{DecodeResources, Model, ModelMode, WeakModel, MAX_WAKE_PHRASES};
pub use rescoring::RescoringLm;
pub use speaker::{SpeakerEmbedding, SpeakerModel, SPEAKER_BANDS};
pub use symbols::{SymbolTable, WordId, EPSILON_ID, UNK_WORD, WORD_NOT_FOUND};
