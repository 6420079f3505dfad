pub mod clipboard;
pub mod config;
pub mod daemon;
pub mod embed;
pub mod errors;
pub mod hash;
pub mod knn;
pub mod lang;
pub mod secrets;
pub mod storage;
