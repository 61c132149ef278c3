// * Result Notifier: presentation state and delivery of result events to the consumer

pub mod dispatcher;
pub mod events;
pub mod groups;

pub use dispatcher::{spawn_dispatcher, NotifierHandle};
pub use events::{EventLog, GroupSnapshot, ItemSnapshot, ResultEvent, ResultNotifier};
pub use groups::{Resolution, ResultGroup, ResultSet};
