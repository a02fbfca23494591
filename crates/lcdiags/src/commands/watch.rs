//! `watch ...`: repeating display tasks and their control.

use std::sync::Arc;

use async_trait::async_trait;
use lcdiags_domain::{LeaseTable, render_table};
use lcdiags_shell::{CommandHandler, HandlerContext, HandlerError, HandlerRegistry};

use super::CommandEnv;

pub(super) fn register(registry: &mut HandlerRegistry, env: &Arc<CommandEnv>) {
    let site_env = env.clone();
    registry.register("watch/site-status", move |ctx| {
        Ok(Box::new(WatchSiteStatus {
            ctx,
            env: site_env.clone(),
        }))
    });
    let lease_env = env.clone();
    registry.register("watch/leases", move |ctx| {
        Ok(Box::new(WatchLeases {
            ctx,
            env: lease_env.clone(),
        }))
    });
    let clock_env = env.clone();
    registry.register("watch/counter", move |ctx| {
        Ok(Box::new(WatchClock {
            ctx,
            env: clock_env.clone(),
        }))
    });
    registry.register("watch/kill", |ctx| Ok(Box::new(WatchKill { ctx })));
    registry.register("watch/tasks", |ctx| Ok(Box::new(WatchTasks { ctx })));
}

/// Re-renders the site status view every interval.
struct WatchSiteStatus {
    ctx: HandlerContext,
    env: Arc<CommandEnv>,
}

#[async_trait]
impl CommandHandler for WatchSiteStatus {
    async fn execute(&mut self) -> Result<Option<String>, HandlerError> {
        let interval = self.env.interval(self.ctx.args())?;
        let view = self.env.site_view();
        self.ctx
            .session
            .start_interval_process("site-status", interval, move || view.render());
        Ok(None)
    }
}

/// Re-reads and renders the lease file every interval.
struct WatchLeases {
    ctx: HandlerContext,
    env: Arc<CommandEnv>,
}

#[async_trait]
impl CommandHandler for WatchLeases {
    async fn execute(&mut self) -> Result<Option<String>, HandlerError> {
        let interval = self.env.interval(self.ctx.args())?;
        let path = self.env.status.leases_path.clone();
        self.ctx
            .session
            .start_interval_process("leases", interval, move || match LeaseTable::read(&path) {
                Ok(table) => table.render(),
                Err(e) => e.to_string(),
            });
        Ok(None)
    }
}

/// Shows the wall clock every interval.
struct WatchClock {
    ctx: HandlerContext,
    env: Arc<CommandEnv>,
}

#[async_trait]
impl CommandHandler for WatchClock {
    async fn execute(&mut self) -> Result<Option<String>, HandlerError> {
        let interval = self.env.interval(self.ctx.args())?;
        self.ctx.session.start_interval_process("clock", interval, || {
            format!("Time: {}", chrono::Local::now().format("%H:%M:%S"))
        });
        Ok(Some(format!("{:?}", self.ctx.tokens)))
    }
}

struct WatchKill {
    ctx: HandlerContext,
}

#[async_trait]
impl CommandHandler for WatchKill {
    async fn execute(&mut self) -> Result<Option<String>, HandlerError> {
        let stopped = self.ctx.session.stop_all().await;
        tracing::info!(stopped, "stopped background tasks on request");
        Ok(Some(format!("All background tasks stopped ({stopped})")))
    }
}

struct WatchTasks {
    ctx: HandlerContext,
}

#[async_trait]
impl CommandHandler for WatchTasks {
    async fn execute(&mut self) -> Result<Option<String>, HandlerError> {
        let tasks = self.ctx.session.supervisor().tasks();
        if tasks.is_empty() {
            return Ok(Some("No background tasks".to_string()));
        }

        let rows: Vec<Vec<String>> = tasks
            .iter()
            .map(|t| {
                vec![
                    t.id.to_string(),
                    t.name.clone(),
                    format!("{:.1}s", t.interval.as_secs_f64()),
                    if t.finished { "stopped" } else { "running" }.to_string(),
                ]
            })
            .collect();
        Ok(Some(render_table(&["ID", "Name", "Interval", "State"], &rows)))
    }
}
