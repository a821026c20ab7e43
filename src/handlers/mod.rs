pub mod assets;
pub mod entries;
pub mod export;
pub mod health;
pub mod stats;
pub mod sync;
pub mod ws;
