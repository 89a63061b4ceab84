pub mod detector;

pub use detector::FileMetadata;
