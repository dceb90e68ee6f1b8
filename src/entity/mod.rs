pub mod email_outbox;
pub mod order_items;
pub mod orders;
pub mod products;

pub use email_outbox::Entity as EmailOutbox;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
