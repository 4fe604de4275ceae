//! Resolution and authorization shared by every resource endpoint:
//! entity lookup, relationship checks, access policies and list scoping.

pub mod context;
pub mod error;
pub mod lookup;
pub mod policy;
pub mod relationship;
pub mod scope;

pub use context::{EventRef, PathParams, RequestContext, Verb};
pub use error::ResourceError;
pub use lookup::{find, find_event, find_resolved};
pub use policy::{authorize_event_reference, has_access, Guard, Policy};
pub use relationship::require;
pub use scope::{scope, Resolved};
