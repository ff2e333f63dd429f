//! Wiring a [`RoomManager`] from configuration and service hooks.

use std::sync::Arc;

use riddlehall_room::{
    MatchOutcome, Notifier, PuzzleResolver, RoomManager, RoomServices, StatsError, StatsSink,
};
use tracing::info;

use crate::RiddlehallError;
use crate::config::HallConfig;

/// Entry point for assembling a hall.
///
/// # Example
///
/// ```rust,ignore
/// use riddlehall::prelude::*;
///
/// let config = HallConfig::load()?;
/// riddlehall::telemetry::init(config.log_filter());
///
/// let (notifier, events) = ChannelNotifier::new();
/// let rooms = Riddlehall::builder()
///     .config(config)
///     .build(PuzzleShelf::new(), notifier)?;
/// ```
pub struct Riddlehall;

impl Riddlehall {
    /// Creates a new builder.
    pub fn builder() -> HallBuilder {
        HallBuilder::new()
    }
}

/// Builder for a [`RoomManager`].
///
/// Without an explicit [`stats`](Self::stats) sink, match outcomes are
/// only logged.
pub struct HallBuilder {
    config: HallConfig,
    stats: Option<Arc<dyn StatsSink>>,
}

impl HallBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: HallConfig::default(),
            stats: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: HallConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets where match outcomes are recorded.
    pub fn stats(mut self, stats: Arc<dyn StatsSink>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Validates the configuration and builds the room manager.
    pub fn build<P: PuzzleResolver>(
        self,
        resolver: P,
        notifier: impl Notifier,
    ) -> Result<RoomManager<P>, RiddlehallError> {
        self.config.validate()?;

        let stats = self.stats.unwrap_or_else(|| Arc::new(LogStats));
        let services = RoomServices::new(Arc::new(notifier), stats);
        let room = self.config.room;
        info!(
            first_room_id = room.first_room_id,
            last_room_id = room.last_room_id,
            "riddlehall ready"
        );
        Ok(RoomManager::new(room, resolver, services))
    }
}

impl Default for HallBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`StatsSink`] that writes each outcome to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStats;

impl StatsSink for LogStats {
    fn record_match_outcome(&self, outcome: &MatchOutcome) -> Result<(), StatsError> {
        info!(
            room_id = %outcome.room_id,
            match_id = %outcome.match_id,
            reason = ?outcome.reason,
            winner = ?outcome.winner,
            participants = outcome.participants.len(),
            "match finished"
        );
        Ok(())
    }
}
