pub mod advance;
pub mod book;
pub mod cancel;
pub mod check;
pub mod common;
pub mod edit;
pub mod expert;
pub mod experts;
pub mod history;
pub mod init;
pub mod list;
pub mod show;
