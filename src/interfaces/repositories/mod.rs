pub mod delivery;
pub mod rate_limit;
