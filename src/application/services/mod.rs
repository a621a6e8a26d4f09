pub mod cache_update_service;
pub mod channel_order_service;
pub mod infinite_scroll;
pub mod post_service;

pub use cache_update_service::{CacheUpdate, CacheUpdateService};
pub use channel_order_service::{ChannelOrderService, DropEvent, ReorderOutcome};
pub use infinite_scroll::{InfiniteScroll, ScrollEvent, ScrollStop};
pub use post_service::PostService;
