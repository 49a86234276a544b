mod credential_store_mysql;

pub use credential_store_mysql::*;
