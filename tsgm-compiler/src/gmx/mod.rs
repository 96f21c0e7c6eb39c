//! GameMaker `.gmx` documents: markup tree, project manifest, default records and resource bookkeeping

pub mod builder;
pub mod project;
pub mod resources;
pub mod xml;

pub use builder::{new_event, new_object, new_project, new_room};
pub use project::{base_name, directory_of, Project, ResourceKind};
pub use resources::{add_resource, remove_resource, validate_resource};
pub use xml::Element;
