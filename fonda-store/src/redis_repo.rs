use async_trait::async_trait;
use fonda_order::{Cart, CartStore};
use redis::{AsyncCommands, RedisResult};

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter. True while `key` is within `limit`.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let (count,): (i64,) = rate_limit_pipeline(key, window_seconds)
            .query_async(&mut conn)
            .await?;
        Ok(count <= limit)
    }
}

/// The window starts with the first hit: `SET NX EX` creates the counter
/// with its expiry once, and `INCR` keeps that TTL.
fn rate_limit_pipeline(key: &str, window_seconds: i64) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("SET")
        .arg(key)
        .arg(0)
        .arg("NX")
        .arg("EX")
        .arg(window_seconds)
        .ignore()
        .incr(key, 1);
    pipe
}

/// Carts serialized as JSON under `cart:{id}`, expiring after `ttl_seconds`
/// of inactivity.
#[derive(Clone)]
pub struct RedisCartStore {
    redis: RedisClient,
    ttl_seconds: u64,
}

impl RedisCartStore {
    pub fn new(redis: RedisClient, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    fn key(cart_id: &str) -> String {
        format!("cart:{}", cart_id)
    }
}

#[async_trait]
impl CartStore for RedisCartStore {
    async fn load(&self, cart_id: &str) -> Result<Cart, Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.redis.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(Self::key(cart_id)).await?;
        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Cart::new()),
        }
    }

    async fn save(&self, cart_id: &str, cart: &Cart) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.redis.client.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(cart)?;
        conn.set_ex::<_, _, ()>(Self::key(cart_id), json, self.ttl_seconds).await?;
        Ok(())
    }

    async fn clear(&self, cart_id: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.redis.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(Self::key(cart_id)).await?;
        Ok(())
    }
}
