// Services module - business logic layer

pub mod cart_service;
pub mod id_sequence;
pub mod product_service;

pub use cart_service::CartService;
pub use id_sequence::ProductIdSequence;
pub use product_service::ProductService;
