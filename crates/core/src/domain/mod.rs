pub mod analysis;
pub mod error;
pub mod presentation;
pub mod resume;
pub mod settings;
pub mod submission;
