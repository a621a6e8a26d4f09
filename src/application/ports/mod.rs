pub mod api_client;
pub mod notifier;
pub mod view_store;

pub use api_client::{ChannelApi, FeedApi, PostApi};
pub use notifier::{Alert, AlertKind, Notifier};
pub use view_store::{PagedUpdater, SingleUpdater, ViewChanged, ViewStore};
