/// Shared helpers
pub mod html;

pub use html::{extract_text, render_body, selector, strip_outgoing};
