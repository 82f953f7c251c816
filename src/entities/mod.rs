pub mod category;
pub mod country;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;
pub mod product_image;
pub mod product_review;
pub mod shipping_address;

pub use category::Entity as Category;
pub use country::Entity as Country;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use payment::Entity as Payment;
pub use product::Entity as Product;
pub use product_image::Entity as ProductImage;
pub use product_review::Entity as ProductReview;
pub use shipping_address::Entity as ShippingAddress;
