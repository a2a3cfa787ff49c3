mod refund_store;

pub use refund_store::{RefundStore, StoreError};
