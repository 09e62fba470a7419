pub mod actions;
pub mod attachment;
pub mod cv_list;
pub mod events;
pub mod hooks;
pub mod matcher;
pub mod processor;
pub mod profile_cache;
pub mod queue;
pub mod text_equivalence;
