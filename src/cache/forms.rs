use crate::cache::FormCache;
use crate::models::EventForm;
use redis::AsyncCommands;
use tracing::info;
use uuid::Uuid;

impl FormCache {
    // Получить схему формы из кеша
    pub async fn get_form(&self, event_id: Uuid) -> Result<Option<EventForm>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(Self::form_key(event_id)).await?;
        match data {
            Some(data) => {
                let form = serde_json::from_str(&data).map_err(|_| {
                    redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
                })?;
                Ok(Some(form))
            }
            None => Ok(None),
        }
    }

    // Сохранить схему формы с TTL
    pub async fn save_form(&self, form: &EventForm) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(form).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(Self::form_key(form.event.id), data, self.ttl_seconds)
            .await
    }

    // Инвалидировать кеш формы
    pub async fn invalidate_form(&self, event_id: Uuid) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let _: () = conn.del(Self::form_key(event_id)).await?;
        info!("Invalidated form cache for event {}", event_id);
        Ok(())
    }
}
