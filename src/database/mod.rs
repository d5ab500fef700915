pub mod pool;
pub mod test_store;
