//! Inlines CSS into the `style` attributes of HTML documents, for mail
//! clients that ignore `<style>` elements.

pub mod dom;
pub mod error;
pub mod generate;
pub mod parser;
pub mod style;
pub mod target;

pub use error::{InlinerError, Result};
pub use style::inliner::{CssInliner, InlinerPhase};
pub use target::StyleTarget;
