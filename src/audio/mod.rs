//! Audio data path: packet framing, decryption relay and the sink seam

pub mod packet;
pub mod relay;
pub mod sink;

pub use packet::AudioPacket;
pub use relay::AudioRelay;
pub use sink::{AudioSink, BufferSink, SinkFactory, WriterSink};
