//! Dashboard view state: four fetch-backed widgets behind one barrier.
//!
//! Summary cards, pie chart, bar chart, and the transaction grid each fetch
//! independently; every outcome — success or failure — signals the barrier,
//! so one failing widget never holds the page hostage. A failed widget
//! keeps its slot `None` and renders its own placeholder while the rest of
//! the dashboard becomes ready.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use std::future::Future;
use std::pin::Pin;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::FetchError;
use crate::net::client::{AnalyticsApi, RecordApi};
use crate::net::types::{ChartData, Dataset, Summary};
use crate::state::grid::GridState;
use crate::state::loading::LoadingBarrier;

/// Barrier source names for the four dashboard widgets.
pub const SOURCES: [&str; 4] = ["summary", "pieChart", "barChart", "grid"];

/// Per-mount dashboard state. Constructed fresh on every view mount.
pub struct DashboardState {
    dataset: Dataset,
    barrier: LoadingBarrier,
    summary: Option<Summary>,
    pie: Option<ChartData>,
    bar: Option<ChartData>,
}

impl DashboardState {
    #[must_use]
    pub fn new(dataset: Dataset) -> Self {
        let mut barrier = LoadingBarrier::new();
        barrier.register_sources(&SOURCES);
        Self { dataset, barrier, summary: None, pie: None, bar: None }
    }

    #[must_use]
    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn pie_chart(&self) -> Option<&ChartData> {
        self.pie.as_ref()
    }

    #[must_use]
    pub fn bar_chart(&self) -> Option<&ChartData> {
        self.bar.as_ref()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.barrier.is_ready()
    }

    /// Drop-the-blocking-overlay hook; true exactly once. See
    /// [`LoadingBarrier::take_release`].
    pub fn take_release(&mut self) -> bool {
        self.barrier.take_release()
    }

    /// Fetch all four widgets concurrently; each widget signals its barrier
    /// source as its own fetch completes, success or failure, so a slow
    /// widget delays only its own settling. The grid is owned by the caller
    /// because it outlives individual reloads; page 1 is loaded here as
    /// part of the mount.
    pub async fn load_all(
        &mut self,
        analytics: &dyn AnalyticsApi,
        records: &dyn RecordApi,
        grid: &mut GridState,
    ) {
        let dataset = self.dataset;
        let mut widgets: FuturesUnordered<WidgetFuture<'_>> = FuturesUnordered::new();
        widgets.push(Box::pin(async move {
            WidgetOutcome::Summary(analytics.summary(dataset).await)
        }));
        widgets.push(Box::pin(async move {
            WidgetOutcome::Pie(analytics.pie_data(dataset).await)
        }));
        widgets.push(Box::pin(async move {
            WidgetOutcome::Bar(analytics.bar_data(dataset).await)
        }));
        widgets.push(Box::pin(async move {
            WidgetOutcome::Grid(grid.load_page(records, 1).await)
        }));

        while let Some(outcome) = widgets.next().await {
            match outcome {
                WidgetOutcome::Summary(result) => {
                    match result {
                        Ok(v) => self.summary = Some(v),
                        Err(e) => tracing::warn!(error = %e, "summary fetch failed"),
                    }
                    self.barrier.signal("summary");
                }
                WidgetOutcome::Pie(result) => {
                    match result {
                        Ok(v) => self.pie = Some(v),
                        Err(e) => tracing::warn!(error = %e, "pie chart fetch failed"),
                    }
                    self.barrier.signal("pieChart");
                }
                WidgetOutcome::Bar(result) => {
                    match result {
                        Ok(v) => self.bar = Some(v),
                        Err(e) => tracing::warn!(error = %e, "bar chart fetch failed"),
                    }
                    self.barrier.signal("barChart");
                }
                WidgetOutcome::Grid(result) => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "grid fetch failed");
                    }
                    self.barrier.signal("grid");
                }
            }
        }
    }
}

/// One widget's completed fetch, tagged with its barrier source.
enum WidgetOutcome {
    Summary(Result<Summary, FetchError>),
    Pie(Result<ChartData, FetchError>),
    Bar(Result<ChartData, FetchError>),
    Grid(Result<(), FetchError>),
}

type WidgetFuture<'a> = Pin<Box<dyn Future<Output = WidgetOutcome> + 'a>>;
