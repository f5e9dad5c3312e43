// Repositories module - whole-file persistence of the collections

pub mod cart_repository;
pub mod collection_file;
pub mod product_repository;

pub use cart_repository::{CartRepository, FileCartRepository};
pub use collection_file::CollectionFile;
pub use product_repository::{FileProductRepository, ProductRepository};
