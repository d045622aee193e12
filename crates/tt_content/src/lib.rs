pub mod ads;
pub mod document;
pub mod frontmatter;
pub mod literal;
pub mod store;
pub mod tierlist;
pub mod validate;

pub use document::{render_article, TierListDocument};
pub use store::ContentDir;
pub use tierlist::ParseMethod;
