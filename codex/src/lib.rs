pub mod copy;
pub mod entry;
pub mod key;
pub mod parser;
pub mod record;

pub use copy::{CopySpec, Modification};
pub use entry::Entry;
pub use key::EntityKey;
pub use record::Record;
