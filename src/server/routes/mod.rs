pub mod ask;
pub mod history;
pub mod image;
pub mod root;
pub mod search;
pub mod stream;
pub mod user;
