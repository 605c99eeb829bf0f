use super::{Action, ActionClient, ActionListOpts, ActionStatus};
use crate::{Context, Error, Result};
use std::collections::{BTreeSet, HashSet};

/// What the polling loop reports to its observer.
pub(crate) enum PollEvent<'a> {
    /// A snapshot of a tracked action.
    Update(&'a Action),
    /// All updates of the initial snapshot or of one poll were reported.
    PollDone,
}

impl ActionClient {
    /// Waits until all `actions` finished successfully.
    ///
    /// Returns the error of the first action observed with status `error`.
    pub async fn wait_for(&self, ctx: &Context, actions: &[Action]) -> Result<()> {
        self.wait_for_func(
            ctx,
            |update| match update.error() {
                Some(err) => Err(Error::Action(err)),
                None => Ok(()),
            },
            actions,
        )
        .await
    }

    /// Polls `actions` until none of them is running, calling `on_update` for
    /// every snapshot observed.
    ///
    /// Actions that are already finished are passed to `on_update` right away
    /// and never polled. An error returned by `on_update` stops the wait and
    /// is returned as is. A tracked action missing from a poll response fails
    /// the wait with [`Error::ActionsNotFound`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hcloud::{Action, ActionStatus, Client, Context};
    ///
    /// # async fn example(client: Client, actions: Vec<Action>) -> Result<(), hcloud::Error> {
    /// let ctx = Context::background();
    /// client
    ///     .action()
    ///     .wait_for_func(
    ///         &ctx,
    ///         |update| {
    ///             if update.status == ActionStatus::Running {
    ///                 println!("action {} at {}%", update.id, update.progress);
    ///             }
    ///             Ok(())
    ///         },
    ///         &actions,
    ///     )
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn wait_for_func<F>(
        &self,
        ctx: &Context,
        mut on_update: F,
        actions: &[Action],
    ) -> Result<()>
    where
        F: FnMut(&Action) -> Result<()>,
    {
        self.poll_actions(
            ctx,
            |event| match event {
                PollEvent::Update(update) => on_update(update),
                PollEvent::PollDone => Ok(()),
            },
            actions,
        )
        .await
    }

    /// Polling loop behind [`wait_for_func`](Self::wait_for_func).
    ///
    /// Emits [`PollEvent::PollDone`] once after the already finished actions
    /// were reported and once after the updates of every poll.
    pub(crate) async fn poll_actions<F>(
        &self,
        ctx: &Context,
        mut on_event: F,
        actions: &[Action],
    ) -> Result<()>
    where
        F: FnMut(PollEvent<'_>) -> Result<()>,
    {
        let mut running = BTreeSet::new();
        for action in actions {
            if action.status == ActionStatus::Running {
                running.insert(action.id);
            } else {
                on_event(PollEvent::Update(action))?;
            }
        }
        on_event(PollEvent::PollDone)?;

        let poll_backoff = self.client.poll_backoff();
        let mut polls = 0;

        while !running.is_empty() {
            ctx.sleep(poll_backoff.delay(polls)).await?;
            polls += 1;

            let opts = ActionListOpts {
                id: running.iter().copied().collect(),
                sort: vec!["status".to_string(), "id".to_string()],
                ..Default::default()
            };
            let updates = self.all(ctx, opts).await?;

            if updates.len() != running.len() {
                let found: HashSet<i64> = updates.iter().map(|a| a.id).collect();
                let missing: Vec<i64> = running
                    .iter()
                    .copied()
                    .filter(|id| !found.contains(id))
                    .collect();
                tracing::warn!(missing = ?missing, "Tracked actions disappeared");
                return Err(Error::ActionsNotFound(missing));
            }

            for update in &updates {
                if update.is_finished() {
                    tracing::debug!(
                        action_id = update.id,
                        status = %update.status,
                        "Action finished"
                    );
                    running.remove(&update.id);
                }
                on_event(PollEvent::Update(update))?;
            }
            on_event(PollEvent::PollDone)?;
        }

        Ok(())
    }
}
