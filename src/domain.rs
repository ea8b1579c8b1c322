pub mod entities;
pub mod media;
pub mod use_cases;
