use super::waiter::PollEvent;
use super::{Action, ActionClient, ActionStatus};
use crate::{Context, Error, Result};
use std::collections::HashMap;
use tokio::sync::mpsc;

impl ActionClient {
    /// Watches `actions` from a background task and reports their combined
    /// progress.
    ///
    /// The progress channel yields the integer average over all actions,
    /// counting finished ones as 100. At most one sample is sent per poll,
    /// only when it is non-zero and differs from the previous one, and it is
    /// dropped when the receiver has not consumed the previous sample yet.
    ///
    /// The error channel yields one [`Error::Action`] per failed action, then
    /// the overall result of the wait. Both channels close when the task ends.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hcloud::{Action, Client, Context};
    ///
    /// # async fn example(client: Client, actions: Vec<Action>) -> Result<(), hcloud::Error> {
    /// let ctx = Context::background();
    /// let (mut progress, mut errors) = client.action().watch_overall_progress(&ctx, actions);
    ///
    /// loop {
    ///     tokio::select! {
    ///         Some(p) = progress.recv() => println!("{}%", p),
    ///         result = errors.recv() => match result {
    ///             Some(Err(err)) => eprintln!("{}", err),
    ///             Some(Ok(())) | None => break,
    ///         },
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn watch_overall_progress(
        &self,
        ctx: &Context,
        actions: Vec<Action>,
    ) -> (mpsc::Receiver<u32>, mpsc::Receiver<Result<()>>) {
        let (progress_tx, progress_rx) = mpsc::channel(1);
        let (err_tx, err_rx) = mpsc::channel(actions.len() + 1);

        let client = self.clone();
        let ctx = ctx.clone();

        tokio::spawn(async move {
            let total = actions.len() as u32;
            let mut progress_by_action: HashMap<i64, u32> = HashMap::with_capacity(actions.len());
            let mut previous = 0;

            let result = client
                .poll_actions(
                    &ctx,
                    |event| {
                        match event {
                            PollEvent::Update(update) => match update.status {
                                ActionStatus::Running => {
                                    progress_by_action.insert(update.id, update.progress);
                                }
                                ActionStatus::Success => {
                                    progress_by_action.insert(update.id, 100);
                                }
                                ActionStatus::Error => {
                                    progress_by_action.insert(update.id, 100);
                                    if let Some(err) = update.error() {
                                        // One slot per action plus the terminal result.
                                        if let Err(e) = err_tx.try_send(Err(Error::Action(err))) {
                                            tracing::warn!(
                                                action_id = update.id,
                                                error = %e,
                                                "Dropped action failure"
                                            );
                                        }
                                    }
                                }
                            },
                            PollEvent::PollDone => {
                                let sum: u32 = progress_by_action.values().sum();
                                let overall = sum.checked_div(total).unwrap_or(0);
                                if overall != 0 && overall != previous {
                                    send_progress(&progress_tx, overall);
                                    previous = overall;
                                }
                            }
                        }
                        Ok(())
                    },
                    &actions,
                )
                .await;

            if let Err(err) = &result {
                tracing::debug!(error = %err, "Watching actions stopped");
            }
            let _ = err_tx.send(result).await;
        });

        (progress_rx, err_rx)
    }

    /// Watches a single action from a background task.
    ///
    /// The progress channel yields the action's own progress and 100 on
    /// success, with the same drop rule as
    /// [`watch_overall_progress`](Self::watch_overall_progress). The error
    /// channel yields exactly one terminal result; a failed action is
    /// reported as [`Error::Action`].
    pub fn watch_progress(
        &self,
        ctx: &Context,
        action: Action,
    ) -> (mpsc::Receiver<u32>, mpsc::Receiver<Result<()>>) {
        let (progress_tx, progress_rx) = mpsc::channel(1);
        let (err_tx, err_rx) = mpsc::channel(1);

        let client = self.clone();
        let ctx = ctx.clone();

        tokio::spawn(async move {
            let result = client
                .wait_for_func(
                    &ctx,
                    |update| match update.status {
                        ActionStatus::Running => {
                            send_progress(&progress_tx, update.progress);
                            Ok(())
                        }
                        ActionStatus::Success => {
                            send_progress(&progress_tx, 100);
                            Ok(())
                        }
                        ActionStatus::Error => match update.error() {
                            Some(err) => Err(Error::Action(err)),
                            None => Ok(()),
                        },
                    },
                    std::slice::from_ref(&action),
                )
                .await;

            let _ = err_tx.send(result).await;
        });

        (progress_rx, err_rx)
    }
}

fn send_progress(tx: &mpsc::Sender<u32>, progress: u32) {
    if tx.try_send(progress).is_err() {
        tracing::trace!(progress = progress, "Dropped progress sample");
    }
}
