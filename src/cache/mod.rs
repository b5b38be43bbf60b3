use crate::redis_client::RedisClient;

pub mod forms;

/// Кеш схем форм в Redis.
///
/// Публичная страница формы и каждая отправка ответа читают схему события,
/// а меняется она только при удалении события.
#[derive(Clone)]
pub struct FormCache {
    redis: RedisClient,
    ttl_seconds: u64,
}

impl FormCache {
    pub fn new(redis: RedisClient, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    fn form_key(event_id: uuid::Uuid) -> String {
        format!("form:{}", event_id)
    }
}
