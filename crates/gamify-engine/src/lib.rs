//! Credit-once gamification engine.
//!
//! Ties the pure rules in `gamify-core` to a durable [`gamify_store::Store`]
//! and a volatile [`gamify_cache::Cache`]:
//!
//! 1. [`guard::IdempotencyGuard`] answers "already credited?" from the cache,
//!    then from the store.
//! 2. [`accounting`] computes points, streak and level for the action.
//! 3. [`badges`] evaluates unlock rules, pulling aggregates through an
//!    [`AggregateCounter`].
//! 4. The completion record and the new ledger are written in one
//!    [`gamify_store::Store::commit_claim`] call.
//! 5. [`projection::Projection`] drops every cached view of the user.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::NaiveDate;
//! use gamify_cache::MemoryCache;
//! use gamify_core::{Action, UserId};
//! use gamify_engine::{ClaimOutcome, EngineConfig, GamificationEngine, StoreAggregates};
//! use gamify_store::MemoryStore;
//!
//! # async fn demo() -> Result<(), gamify_engine::EngineError> {
//! let store = Arc::new(MemoryStore::new());
//! let engine = GamificationEngine::new(
//!     store.clone(),
//!     Arc::new(MemoryCache::new()),
//!     Arc::new(StoreAggregates::new(store)),
//!     EngineConfig::default(),
//! );
//!
//! let action = Action::MedicationCheck { medication_id: "m1".into() };
//! let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
//! match engine.claim_and_award(&UserId::generate(), &action, day).await? {
//!     ClaimOutcome::Awarded(award) => println!("+{}", award.points_added),
//!     ClaimOutcome::AlreadyCredited => println!("already credited"),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod accounting;
pub mod aggregates;
pub mod badges;
pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod projection;

pub use aggregates::{AggregateCounter, StoreAggregates};
pub use config::{EngineConfig, ViewTtls};
pub use engine::{AwardResult, ClaimOutcome, GamificationEngine, UserStats};
pub use error::{AggregateError, EngineError, Result};
