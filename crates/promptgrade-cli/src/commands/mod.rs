pub mod branch;
pub mod context;
pub mod create;
pub mod deploy;
pub mod evaluate;
pub mod init;
pub mod show;
pub mod validate;
