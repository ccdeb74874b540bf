//! Read-side order model: the assembled aggregate, the search filter and the
//! views returned to callers.

pub mod order;
pub mod search;
pub mod view;

pub use order::{
    Address, DeliveryId, ItemId, MemberId, Order, OrderId, OrderLine, OrderLineId, OrderStatus,
};
pub use search::{OrderSearch, Page};
pub use view::{OrderLineView, OrderView};
