pub mod api_key;
pub mod cv;
pub mod hook;
pub mod matches;
pub mod profile;
pub mod scan;
