// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::Result;
use crate::errors::{Error, Stage};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Carries cancellation and an optional deadline for a request.
///
/// A [ClientFactory][crate::factory::ClientFactory] runs each network stage
/// under the context. Cancelling the token, or reaching the deadline, aborts
/// the stage that is in progress.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Sets the deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Sets the deadline. An earlier deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Uses `token` to cancel the operations running under this context.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Runs `fut` until it completes, the context is cancelled, or the
    /// deadline expires.
    ///
    /// ```
    /// # use delegated_auth::Context;
    /// # tokio_test::block_on(async {
    /// let ctx = Context::background();
    /// assert_eq!(ctx.run(async { 42 }).await, Ok(42));
    /// # });
    /// ```
    pub async fn run<F>(&self, fut: F) -> std::result::Result<F::Output, Interrupted>
    where
        F: Future,
    {
        if self.cancellation.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(Interrupted::Cancelled),
            _ = deadline => Err(Interrupted::DeadlineExceeded),
            r = fut => Ok(r),
        }
    }

    /// Runs one stage of the credential flow under the context.
    pub(crate) async fn run_stage<F, T>(&self, stage: Stage, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.run(fut).await {
            Ok(r) => r,
            Err(Interrupted::Cancelled) => Err(Error::cancelled(stage)),
            Err(Interrupted::DeadlineExceeded) => Err(Error::deadline_exceeded(stage)),
        }
    }
}

/// Why [Context::run] stopped before the future completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupted {
    Cancelled,
    DeadlineExceeded,
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = anyhow::Result<()>;

    #[tokio::test]
    async fn background_completes() -> TestResult {
        let ctx = Context::background();
        assert!(ctx.deadline().is_none());
        let got = ctx.run_stage(Stage::Signing, async { Ok(42) }).await?;
        assert_eq!(got, 42);
        Ok(())
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let ctx = Context::background();
        let err = ctx
            .run_stage::<_, ()>(Stage::Exchange, async {
                Err(Error::transport("connection refused"))
            })
            .await
            .unwrap_err();
        assert!(err.is_transport(), "{err:?}");
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = Context::background().with_cancellation(token);
        let err = ctx
            .run_stage(Stage::Signing, async { Ok(()) })
            .await
            .unwrap_err();
        assert!(err.is_cancelled(), "{err:?}");
        assert_eq!(err.stage(), Some(Stage::Signing));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_while_running() {
        let token = CancellationToken::new();
        let ctx = Context::background().with_cancellation(token.clone());
        let cancel = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        };
        let work = ctx.run_stage(Stage::Exchange, async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        });
        let (_, result) = tokio::join!(cancel, work);
        let err = result.unwrap_err();
        assert!(err.is_cancelled(), "{err:?}");
        assert_eq!(err.stage(), Some(Stage::Exchange));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_exceeded() {
        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        let err = ctx
            .run_stage(Stage::Exchange, async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(err.is_deadline_exceeded(), "{err:?}");
        assert_eq!(err.stage(), Some(Stage::Exchange));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_not_reached() -> TestResult {
        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        let got = ctx
            .run_stage(Stage::Signing, async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok("done")
            })
            .await?;
        assert_eq!(got, "done");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn run_reports_interruption() {
        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        let got = ctx
            .run(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert_eq!(got, Err(Interrupted::DeadlineExceeded));

        let token = CancellationToken::new();
        token.cancel();
        let ctx = Context::background().with_cancellation(token);
        assert_eq!(ctx.run(async { "done" }).await, Err(Interrupted::Cancelled));

        assert_eq!(Context::background().run(async { "done" }).await, Ok("done"));
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = Context::background()
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(5)));
    }
}
