pub mod fileio;
pub mod voices;
pub mod wav;
