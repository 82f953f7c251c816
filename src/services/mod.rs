pub mod catalog;
pub mod checkout;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod reconciler;
pub mod stock;
