pub mod bus;

pub use bus::{RedisUpdateProducer, DEFAULT_MIRROR_BUFFER};
