pub mod layers;
pub mod packet;

pub use layers::LayerStack;
pub use packet::{CapturedPacket, Protocol};
