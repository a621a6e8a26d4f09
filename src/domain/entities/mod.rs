pub mod channel;
pub mod channel_order;
pub mod paged_view;
pub mod post;
pub mod user;

pub use channel::Channel;
pub use channel_order::{OrderedItem, ReorderPhase, reconcile_order};
pub use paged_view::{CachedView, PagedCollection};
pub use post::{AuthorRef, ChannelRef, Post, PostDraft, PostPatch, PostRecord};
pub use user::{AuthUser, UserRole};
