pub mod outcome;
pub mod storage;
