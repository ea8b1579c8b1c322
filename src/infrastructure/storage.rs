pub mod blob_registry;
pub mod media_reader;
pub mod supabase;
