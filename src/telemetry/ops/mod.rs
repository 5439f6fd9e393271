pub mod fetch;
pub mod deliver;
pub mod source;
pub mod init;
pub mod run;
