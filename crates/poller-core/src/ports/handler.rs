//! MessageHandler port - メッセージ本文を解釈する外部ロジック

use async_trait::async_trait;

use crate::domain::{HandlerError, Message};

/// Business logic invoked once per received message.
///
/// # 使用例
/// ```ignore
/// struct Forward;
///
/// #[async_trait]
/// impl MessageHandler for Forward {
///     async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
///         println!("{}", message.body);
///         Ok(())
///     }
/// }
/// ```
///
/// An `Err` is logged together with the body and never stops the loop.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError>;
}
