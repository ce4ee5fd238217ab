//! Domain models for the shop API.
//!
//! These types represent validated domain objects separate from database row
//! types. Cart and order documents are stored as JSONB and round-trip through
//! the serde derives defined here.

pub mod address;
pub mod cart;
pub mod order;
pub mod page;
pub mod product;
pub mod user;

pub use address::ShippingAddress;
pub use cart::{CartDocument, CartError, CartItem};
pub use order::{Order, OrderItem, OrderSummary, OrderTotals, PaymentMethod};
pub use page::{Page, PageQuery, Pagination};
pub use product::{Product, ProductInput, ProductSort, slugify};
pub use user::User;
