//! Notificaciones transitorias para el panel de administración
//!
//! Equivalente en servidor a los "toasts": el controlador publica cada
//! inicio, éxito o fallo de un flujo y los clientes conectados por SSE los
//! reciben. Publicar sin suscriptores no hace nada.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Loading,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn publish(&self, level: NotificationLevel, message: impl Into<String>) {
        let _ = self.sender.send(Notification {
            level,
            message: message.into(),
        });
    }

    pub fn loading(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Loading, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Error, message);
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = NotificationBus::new(8);
        let mut rx = bus.subscribe();

        bus.loading("Creando vehículo...");
        bus.success("Vehículo creado!");

        assert_eq!(rx.recv().await.unwrap().level, NotificationLevel::Loading);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.level, NotificationLevel::Success);
        assert_eq!(second.message, "Vehículo creado!");
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = NotificationBus::default();
        bus.error("nadie escucha");
    }
}
