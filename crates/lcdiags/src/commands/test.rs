//! `test`: a counter task for checking the display path end to end.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use lcdiags_shell::{CommandHandler, HandlerContext, HandlerError, HandlerRegistry};

use super::CommandEnv;

pub(super) fn register(registry: &mut HandlerRegistry, env: &Arc<CommandEnv>) {
    let env = env.clone();
    registry.register("test", move |ctx| {
        Ok(Box::new(Counter {
            ctx,
            env: env.clone(),
        }))
    });
}

struct Counter {
    ctx: HandlerContext,
    env: Arc<CommandEnv>,
}

#[async_trait]
impl CommandHandler for Counter {
    async fn execute(&mut self) -> Result<Option<String>, HandlerError> {
        let interval = self.env.interval(self.ctx.args())?;
        let ticks = AtomicU64::new(0);
        self.ctx.session.start_interval_process("counter", interval, move || {
            match ticks.fetch_add(1, Ordering::Relaxed) {
                0 => "Starting".to_string(),
                n => format!("Counter: {n}"),
            }
        });
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lcdiags_shell::DispatchOutcome;

    use super::*;
    use crate::commands::testing::shell;

    #[tokio::test]
    async fn test_counts_up_after_starting() {
        let (shell, display) = shell(CommandEnv::default());

        assert_eq!(shell.submit("test 0.05").await, DispatchOutcome::Silent);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(display.text(), "Starting");

        tokio::time::sleep(Duration::from_millis(200)).await;
        let text = display.text();
        let n: u64 = text
            .strip_prefix("Counter: ")
            .and_then(|n| n.parse().ok())
            .unwrap_or_else(|| panic!("unexpected display: {text}"));
        assert!(n >= 2);

        assert_eq!(shell.shutdown(Duration::from_secs(1)).await.stopped, 1);
    }
}
