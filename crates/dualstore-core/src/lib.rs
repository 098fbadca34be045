pub mod events;
pub mod id;
pub mod resource;

pub use events::{WatchBroadcaster, WatchEvent, WatchEventType};
pub use id::{IdError, generate_name, generate_uid, validate_name};
pub use resource::{ObjectMeta, ResourceObject};
