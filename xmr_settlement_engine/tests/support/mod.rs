pub mod prepare_env;

pub use prepare_env::{new_test_database, prepare_test_env, random_db_path};
