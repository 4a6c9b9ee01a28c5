//! Records — typed record model and the read-only store.

mod record;
mod store;

pub use record::{FieldText, Record};
pub use store::{RecordSource, RecordStore};
