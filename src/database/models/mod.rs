pub mod event;
pub mod faq;
pub mod microlocation;
pub mod role;
pub mod session;

pub use event::Event;
pub use faq::{Faq, FaqChanges, NewFaq};
pub use microlocation::{Microlocation, MicrolocationChanges, NewMicrolocation};
pub use role::{EventRole, RoleName};
pub use session::Session;

use serde_json::Value;

/// Column access for rows that the list filter can match and sort on
pub trait Row {
    fn column(&self, name: &str) -> Value;
}
