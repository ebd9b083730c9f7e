use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget publish; a closed or full channel never fails the caller.
    pub async fn publish(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "event dropped");
        }
    }
}

/// Domain events raised after a successful commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    AssetCreated { organization_id: i32, asset_id: i32 },
    AssetUpdated { organization_id: i32, asset_id: i32 },
    AssetTransferred { organization_id: i32, asset_id: i32 },
    AssetDisposed { organization_id: i32, asset_id: i32 },
    AssetDeleted { organization_id: i32, asset_id: i32 },
    AssetRequestRaised { organization_id: i32, request_id: i32, asset_id: i32 },
    AssetRequestApproved { organization_id: i32, request_id: i32, level: i32, completed: bool },
    AssetRequestRejected { organization_id: i32, request_id: i32 },

    RoleCreated { organization_id: i32, role_id: i32 },
    RoleUpdated { organization_id: i32, role_id: i32 },
    RoleDeleted { organization_id: i32, role_id: i32 },
    UserClaimsSynchronized { organization_id: i32, users: usize },

    OrganizationRegistered { organization_id: i32, user_id: Uuid },
    EmailConfirmed(Uuid),
    UserLoggedIn { organization_id: i32, user_id: Uuid },
    UserLoggedOut(Uuid),
    LoginProvisioned(Uuid),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::AssetCreated { .. } => "asset_created",
            Event::AssetUpdated { .. } => "asset_updated",
            Event::AssetTransferred { .. } => "asset_transferred",
            Event::AssetDisposed { .. } => "asset_disposed",
            Event::AssetDeleted { .. } => "asset_deleted",
            Event::AssetRequestRaised { .. } => "asset_request_raised",
            Event::AssetRequestApproved { .. } => "asset_request_approved",
            Event::AssetRequestRejected { .. } => "asset_request_rejected",
            Event::RoleCreated { .. } => "role_created",
            Event::RoleUpdated { .. } => "role_updated",
            Event::RoleDeleted { .. } => "role_deleted",
            Event::UserClaimsSynchronized { .. } => "user_claims_synchronized",
            Event::OrganizationRegistered { .. } => "organization_registered",
            Event::EmailConfirmed(_) => "email_confirmed",
            Event::UserLoggedIn { .. } => "user_logged_in",
            Event::UserLoggedOut(_) => "user_logged_out",
            Event::LoginProvisioned(_) => "login_provisioned",
        }
    }
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("sams_events_processed_total", 1, "event" => event.name());

        match &event {
            Event::AssetTransferred {
                organization_id,
                asset_id,
            }
            | Event::AssetDisposed {
                organization_id,
                asset_id,
            } => {
                info!(
                    organization_id,
                    asset_id,
                    event = event.name(),
                    "asset lifecycle transition"
                );
            }
            Event::AssetRequestApproved {
                request_id,
                level,
                completed,
                ..
            } => {
                info!(request_id, level, completed, "asset request signed off");
            }
            Event::UserClaimsSynchronized {
                organization_id,
                users,
            } => {
                info!(organization_id, users, "role claims recomputed");
            }
            _ => {
                info!("Received event: {:?}", event);
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        sender
            .publish(Event::AssetCreated {
                organization_id: 1,
                asset_id: 9,
            })
            .await;

        assert_eq!(
            rx.recv().await,
            Some(Event::AssetCreated {
                organization_id: 1,
                asset_id: 9
            })
        );
    }

    #[tokio::test]
    async fn publish_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        sender.publish(Event::UserLoggedOut(Uuid::new_v4())).await;
        assert!(sender.send(Event::UserLoggedOut(Uuid::new_v4())).await.is_err());
    }
}
