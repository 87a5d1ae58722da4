pub mod db;
pub mod dubbing;
pub mod media;
pub mod storage;
