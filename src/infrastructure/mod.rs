pub mod db;
pub mod delivery;
pub mod limiter;
pub mod utils;
