// Not every test binary uses both helpers.
#[allow(unused_imports)]
pub use jobtree_test_utils::{init_tracing, with_timeout};
