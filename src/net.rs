mod content;
mod fetch;
mod response;

pub use content::{BodyStream, Content};
pub(crate) use content::collect;
pub use fetch::{fetch, send};
pub use response::{Response, ResponseEnvelope};
