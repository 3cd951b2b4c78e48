pub mod retry_loop;
pub mod sweeper_loop;
