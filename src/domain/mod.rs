//! Domain layer: resource identity and typed resource models.

pub mod kind;
pub mod meta;
pub mod resources;

pub use kind::{ParseKindError, ResourceKind};
pub use meta::ObjectMeta;
pub use resources::Resource;
