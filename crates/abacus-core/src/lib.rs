//! abacus-core
//!
//! Building blocks for a distributed arithmetic task runner.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（task, status, ids, clock）
//! - **store**: TaskStore ポートと開発用の InMemory 実装
//! - **eval**: 式の評価器（tokenize → reduce → finalize）
//! - **route**: タスク ID からレーンへの決定的ハッシュ
//! - **lock**: ストア経由の排他制御（in-process ヒント付き）
//! - **poller / worker / agent**: 実行ループとその合成
//! - **orchestra**: 投入・取得のファサード
//!
//! Multiple agents may share one task store; mutual exclusion lives in the
//! store's lock rows, and everything in-process is a hint, not the truth.
//!
//! Delivery contract: at-least-once. The poller happily rediscovers a task
//! on every cycle until its status turns terminal, so processing must be
//! (and is) idempotent by task id: workers re-read the record under the
//! lock and back off from anything already finished.

pub mod agent;
pub mod config;
pub mod domain;
pub mod error;
pub mod eval;
pub mod lock;
pub mod observability;
pub mod orchestra;
pub mod poller;
pub mod route;
pub mod store;
pub mod worker;
