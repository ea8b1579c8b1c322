pub mod category;
pub mod gesture;
pub mod image;
pub mod option_fields;
pub mod profile;
pub mod session;
