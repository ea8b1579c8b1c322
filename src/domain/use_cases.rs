pub mod extractors;
pub mod gestures;
pub mod profile;
