//! Contract for messaging services (microblogs, SMS, mail) that talks and
//! schedule changes are announced through.

use crate::core::{ObjectError, ObjectResult};
use crate::hooks::{ObjectEvent, ObjectObserver};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settings handed to a glue implementation, usually read from a JSON file.
pub type GlueConfig = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlueMessage {
    pub sender: String,
    /// `None` for public posts.
    pub recipient: Option<String>,
    pub body: String,
    pub sent_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait Glue: Send + Sync {
    fn from_config(config: &GlueConfig) -> ObjectResult<Self>
    where
        Self: Sized;

    /// Messages addressed to this account only.
    async fn read_private(&self) -> ObjectResult<Vec<GlueMessage>>;

    /// Messages visible to every follower.
    async fn read_public(&self) -> ObjectResult<Vec<GlueMessage>>;

    /// Sends `body` to `recipient`, or posts it publicly when `None`.
    async fn send(&self, recipient: Option<&str>, body: &str) -> ObjectResult<()>;
}

/// Non-empty string setting, or `MissingConfig`.
pub fn required_setting<'a>(config: &'a GlueConfig, key: &str) -> ObjectResult<&'a str> {
    config
        .get(key)
        .and_then(serde_json::Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ObjectError::MissingConfig(key.to_string()))
}

/// Observer that announces object events through a glue service.
///
/// Send failures are logged and never fail the mutation that caused them.
pub struct GlueNotifier<G> {
    glue: G,
    recipient: Option<String>,
}

impl<G: Glue> GlueNotifier<G> {
    pub fn new(glue: G) -> Self {
        Self {
            glue,
            recipient: None,
        }
    }

    pub fn to_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn glue(&self) -> &G {
        &self.glue
    }

    fn render(event: &ObjectEvent) -> String {
        if event.changed.is_empty() {
            format!("{} {} {}", event.entity, event.key, event.kind)
        } else {
            format!(
                "{} {} {} ({})",
                event.entity,
                event.key,
                event.kind,
                event.changed.join(", ")
            )
        }
    }
}

#[async_trait]
impl<G: Glue> ObjectObserver for GlueNotifier<G> {
    async fn notify(&self, event: &ObjectEvent) {
        let body = Self::render(event);
        if let Err(err) = self.glue.send(self.recipient.as_deref(), &body).await {
            log::warn!(
                "glue notification for {} {} failed: {}",
                event.entity,
                event.key,
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::ObjectEventKind;
    use std::sync::Mutex;

    struct Loopback {
        account: String,
        outbox: Mutex<Vec<GlueMessage>>,
        offline: bool,
    }

    #[async_trait]
    impl Glue for Loopback {
        fn from_config(config: &GlueConfig) -> ObjectResult<Self> {
            Ok(Self {
                account: required_setting(config, "account")?.to_string(),
                outbox: Mutex::new(Vec::new()),
                offline: config.get("offline").and_then(|v| v.as_bool()).unwrap_or(false),
            })
        }

        async fn read_private(&self) -> ObjectResult<Vec<GlueMessage>> {
            let outbox = self.outbox.lock().unwrap();
            Ok(outbox.iter().filter(|m| m.recipient.is_some()).cloned().collect())
        }

        async fn read_public(&self) -> ObjectResult<Vec<GlueMessage>> {
            let outbox = self.outbox.lock().unwrap();
            Ok(outbox.iter().filter(|m| m.recipient.is_none()).cloned().collect())
        }

        async fn send(&self, recipient: Option<&str>, body: &str) -> ObjectResult<()> {
            if self.offline {
                return Err(ObjectError::InvalidConfig("service offline".to_string()));
            }
            self.outbox.lock().unwrap().push(GlueMessage {
                sender: self.account.clone(),
                recipient: recipient.map(String::from),
                body: body.to_string(),
                sent_at: None,
            });
            Ok(())
        }
    }

    fn config(json: serde_json::Value) -> GlueConfig {
        json.as_object().cloned().unwrap()
    }

    fn event() -> ObjectEvent {
        ObjectEvent {
            kind: ObjectEventKind::Updated,
            entity: "Screen",
            key: "1".to_string(),
            changed: vec!["strScreen", "lastChange"],
            state: serde_json::json!({"intScreenID": 1}),
        }
    }

    #[test]
    fn test_required_setting() {
        let settings = config(serde_json::json!({"account": "cfm", "blank": "", "port": 5}));
        assert_eq!(required_setting(&settings, "account").unwrap(), "cfm");
        for key in ["blank", "port", "missing"] {
            assert!(matches!(
                required_setting(&settings, key),
                Err(ObjectError::MissingConfig(name)) if name == key
            ));
        }
        assert!(Loopback::from_config(&GlueConfig::new()).is_err());
    }

    #[tokio::test]
    async fn test_notifier_posts_event() {
        let glue = Loopback::from_config(&config(serde_json::json!({"account": "cfm"}))).unwrap();
        let notifier = GlueNotifier::new(glue);
        notifier.notify(&event()).await;

        let public = notifier.glue().read_public().await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].body, "Screen 1 updated (strScreen, lastChange)");
        assert!(notifier.glue().read_private().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notifier_swallows_send_failure() {
        let glue = Loopback::from_config(&config(
            serde_json::json!({"account": "cfm", "offline": true}),
        ))
        .unwrap();
        let notifier = GlueNotifier::new(glue).to_recipient("admin");
        notifier.notify(&event()).await;
        assert!(notifier.glue().read_private().await.unwrap().is_empty());
    }
}
