//! docdex-answer
//!
//! Turns ranked search hits into a scored, explained answer: confidence,
//! cited sources, a deterministic exploration flow, and follow-up
//! suggestions. An external language-generation collaborator may polish
//! the prose but never the numbers.

pub mod generator;
pub mod synthesizer;

pub use generator::HttpGenerator;
pub use synthesizer::AnswerSynthesizer;
