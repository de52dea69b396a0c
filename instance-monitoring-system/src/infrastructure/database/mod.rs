mod redis;

pub use self::redis::{RedisClient, RedisConnection};
