//! `show ...`: one-shot renders.

use std::sync::Arc;

use async_trait::async_trait;
use lcdiags_shell::{CommandHandler, HandlerError, HandlerRegistry};

use super::CommandEnv;

pub(super) fn register(registry: &mut HandlerRegistry, env: &Arc<CommandEnv>) {
    let env = env.clone();
    registry.register("show/site-status", move |_ctx| {
        Ok(Box::new(ShowSiteStatus { env: env.clone() }))
    });
}

struct ShowSiteStatus {
    env: Arc<CommandEnv>,
}

#[async_trait]
impl CommandHandler for ShowSiteStatus {
    async fn execute(&mut self) -> Result<Option<String>, HandlerError> {
        let view = self.env.site_view();
        let text = tokio::task::spawn_blocking(move || view.render())
            .await
            .map_err(HandlerError::failed)?;
        Ok(Some(text))
    }
}
