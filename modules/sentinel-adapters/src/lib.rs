pub mod adapter;
pub mod business_registry;
pub mod events_export;
pub mod feed;
pub mod raw_item;

pub use adapter::{AdapterRegistry, SourceAdapter};
pub use business_registry::BusinessRegistryAdapter;
pub use events_export::EventsExportAdapter;
pub use feed::FeedAdapter;
pub use raw_item::RawItem;
