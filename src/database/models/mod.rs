pub mod article;
pub mod category;
pub mod user;

pub use article::{Article, ArticleListing, ArticlePatch};
pub use category::{Category, CategoryPatch, CategorySummary, NewCategory};
pub use user::{Credentials, PublicUser, User, UserPatch};
