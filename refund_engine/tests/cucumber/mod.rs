mod refund_world;
mod setups;
mod steps;

pub use refund_world::RefundWorld;
