pub mod gesture;
pub mod media;
pub mod object_store;
pub mod profile;
pub mod sqlx_repo;
pub mod token;
