pub mod candidate_limit;
pub mod pass_lock;
pub mod summary;
pub mod usecase;
pub mod worker_pool;
