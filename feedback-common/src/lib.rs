pub mod dedup;
pub mod flatten;
pub mod page;
pub mod signature;
pub mod time;
