pub mod cache_operation;
pub mod identifier;
pub mod view_key;

pub use cache_operation::CacheOperation;
pub use identifier::{ChannelId, Identifier, PostId, UserId};
pub use view_key::ViewKey;
