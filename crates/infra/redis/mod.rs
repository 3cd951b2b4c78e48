pub mod quota_store;
