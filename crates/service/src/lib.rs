pub mod errors;
pub mod import;
pub mod records;
pub mod storage;
