use std::sync::Arc;
use std::time::Duration;

use common::context::AppContext;
use common::log;

/// Background ticker that keeps the spectate feed moving.
pub struct SpectatorTask {
    context: Arc<AppContext>,
    step_interval: Duration,
}

impl SpectatorTask {
    pub fn new(context: Arc<AppContext>) -> Self {
        let step_interval = context.spectate.settings().step_interval();
        Self {
            context,
            step_interval,
        }
    }

    pub async fn run(&self) {
        log!(
            "Spectator feed running {} bots every {:?}",
            self.context.spectate.settings().bot_count,
            self.step_interval
        );
        let mut interval = tokio::time::interval(self.step_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.context.spectate.step_all().await;
        }
    }
}
