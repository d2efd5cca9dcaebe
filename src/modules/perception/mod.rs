pub mod structs;
pub mod news;

pub use structs::Article;
pub use news::NewsClient;
