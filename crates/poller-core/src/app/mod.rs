//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて polling worker を実装します。
//!
//! # 主要コンポーネント
//! - **QueueResolver**: 名前（完全一致 → 部分一致）から queue を解決
//! - **PollLoop**: fetch → handle → delete → decide のループ
//! - **BackoffPolicy**: fetch 失敗の分類と待機時間
//! - **WorkerLifecycle**: Forever / Bounded の終了判定
//! - **PollerBuilder**: 上記のワイヤリング

pub mod backoff;
pub mod builder;
pub mod lifecycle;
pub mod poll_loop;
pub mod resolver;

// 主要な型を再エクスポート
pub use self::backoff::BackoffPolicy;
pub use self::builder::{BuildError, PollerBuilder};
pub use self::lifecycle::WorkerLifecycle;
pub use self::poll_loop::{PollLoop, PollSettings};
pub use self::resolver::QueueResolver;
