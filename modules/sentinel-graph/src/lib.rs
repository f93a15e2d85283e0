pub mod client;
pub mod migrate;
pub mod writer;

pub use client::GraphClient;
pub use migrate::migrate;
pub use writer::{DocumentUpsert, GraphWriter};

pub use neo4rs::query;
