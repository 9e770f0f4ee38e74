//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部システム（queue provider, message handler, 時刻）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod clock;
pub mod handler;
pub mod queue_client;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::handler::MessageHandler;
pub use self::queue_client::QueueClient;
