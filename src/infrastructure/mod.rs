pub mod cart_repo;
pub mod catalog_repo;
pub mod image_store;
pub mod memory;
pub mod models;
pub mod order_repo;
pub mod payment_repo;
pub mod settings_repo;

#[cfg(test)]
pub(crate) mod test_db;
