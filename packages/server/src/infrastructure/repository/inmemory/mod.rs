//! インメモリ Repository 実装
//!
//! プロセス内の HashMap を DB として使用します。再起動でデータは失われます。

mod connection;
mod message;
mod room;
mod translation;

pub use connection::InMemoryConnectionRepository;
pub use message::InMemoryMessageRepository;
pub use room::InMemoryRoomRepository;
pub use translation::InMemoryTranslationRepository;
