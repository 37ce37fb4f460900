//! Tools shipped with the toolbox.

mod add;
mod docs_search;
mod status;

pub use add::{AddTool, AddToolParameters};
pub use docs_search::{DocsSearchTool, DocsSearchToolParameters};
pub use status::{StatusTool, StatusToolParameters};
