pub mod error;
pub mod transcript;

// Expose the main entry point
pub use transcript::Transcript;
