pub mod blobs;
pub mod categories;
pub mod gestures;
pub mod home;
pub mod json_error;
pub mod profile;
pub mod system;
pub mod uploads;
