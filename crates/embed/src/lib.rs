pub mod chunk;
pub mod client;

pub use chunk::{chunk_text, Chunk};
pub use client::{EmbeddingClient, EmbeddingTask};
