mod health;
mod hook;

pub use health::health_router;
pub use hook::hook_router;
pub use self_test::self_test_router;
