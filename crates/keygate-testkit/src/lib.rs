//! # Keygate Testkit
//!
//! Testing utilities for keygate.
//!
//! ## Overview
//!
//! - **Golden vectors**: known keys, hashes, recaps and statement renderings
//! - **Generators**: proptest strategies for wallets and condition sets
//! - **Fixtures**: a simulated chain and network with funded wallets
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use keygate_testkit::fixtures::TestWorld;
//!
//! async fn example() -> keygate::Result<()> {
//!     let world = TestWorld::new();
//!     let client = world.client(world.holder());
//!
//!     client
//!         .connected(|client| async move {
//!             let delegation = client.mint_capacity_credits().await?;
//!             let message = client.encrypt_string("Hello, world!").await?;
//!             client.decrypt_string(&message, &delegation).await
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use keygate_testkit::generators::condition_set;
//!
//! proptest! {
//!     #[test]
//!     fn digest_is_deterministic(set in condition_set(4)) {
//!         prop_assert_eq!(set.digest(), set.clone().digest());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{CountingSigner, TestClient, TestWorld};
pub use vectors::verify_all_vectors;
