use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Init,
    Ready,
    Shutdown,
}

#[async_trait::async_trait]
pub trait LifecycleComponent {
    async fn on_init(&mut self) -> Result<()> {
        Ok(())
    }
    async fn on_start(&mut self) -> Result<()> {
        Ok(())
    }
    async fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

pub type SharedComponent = Arc<Mutex<dyn LifecycleComponent + Send + Sync>>;

/// Drives attached components through init, start and shutdown in
/// attachment order.
pub struct LifecycleManager {
    state: LifecycleState,
    components: Vec<SharedComponent>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Init,
            components: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn attach(&mut self, component: SharedComponent) {
        self.components.push(component);
    }

    pub async fn start(&mut self) -> Result<()> {
        info!("Lifecycle phase: init");
        for comp in &self.components {
            comp.lock().await.on_init().await?;
        }
        for comp in &self.components {
            comp.lock().await.on_start().await?;
        }
        self.state = LifecycleState::Ready;
        info!("Lifecycle phase: ready");
        Ok(())
    }

    /// Shutdown errors are logged; every component gets its turn.
    pub async fn shutdown(&mut self) {
        info!("Lifecycle phase: shutdown");
        self.state = LifecycleState::Shutdown;
        for comp in &self.components {
            if let Err(e) = comp.lock().await.on_shutdown().await {
                warn!("Component shutdown error: {}", e);
            }
        }
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
