pub mod error;
pub mod expander;
pub mod index;
pub mod modify;
pub mod naming;
pub mod ownership;
pub mod renderer;
pub mod resolver;
pub mod rewrite;
pub mod template;

pub use error::{Error, PatternError, RenderError, ResolveError};
pub use expander::expand;
pub use index::RecordIndex;
pub use ownership::Ownership;
pub use renderer::{Renderer, render, render_one};
pub use resolver::{Resolver, resolve, resolve_all};
pub use template::FragmentTable;
