pub mod assembler;
pub mod capability;
pub mod chunking;
pub mod espeak;
pub mod orchestrator;
pub mod pipeline;
pub mod segmentation;
