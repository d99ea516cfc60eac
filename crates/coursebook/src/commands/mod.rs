pub mod build;
pub mod init;
pub mod rewrite;
pub mod serve;
