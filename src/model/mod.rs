//! Document model for translation jobs.
//!
//! A [`Book`] owns its [`Page`]s, each page owns its [`Content`] units. The
//! model carries both the extracted originals and the translation state.

mod book;
mod content;
mod page;
mod resource;
mod table;

pub use book::Book;
pub use content::{Content, ContentKind, Original, Translation, TranslationValue};
pub use page::Page;
pub use resource::{DefaultImageLoader, ImageHandle, ImageLoader};
pub use table::{grids_to_text, Grid, TableGrid, CELL_DELIMITER};
