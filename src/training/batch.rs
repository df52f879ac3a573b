//! Season-wide batch training
//!
//! Trains every player who appears in the league per-game table. Per-player
//! failures are logged and counted; they never stop the batch.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::data::StatsSource;
use crate::training::{TrainOutcome, Trainer};
use crate::{PlayerId, Result, Season};

/// Summary of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub trained: Vec<PlayerId>,
    pub skipped: Vec<PlayerId>,
    pub failed: Vec<(PlayerId, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.trained.len() + self.skipped.len() + self.failed.len()
    }

    fn record(&mut self, player: PlayerId, result: Result<TrainOutcome>) {
        match result {
            Ok(TrainOutcome::Trained(_)) => self.trained.push(player),
            Ok(TrainOutcome::Skipped { .. }) => self.skipped.push(player),
            Err(e) => self.failed.push((player, e.to_string())),
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} players: {} trained, {} skipped, {} failed",
            self.total(),
            self.trained.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Runs a [`Trainer`] over every player in a season
pub struct BatchTrainer<S> {
    trainer: Trainer<S>,
    workers: usize,
}

impl<S: StatsSource + Sync> BatchTrainer<S> {
    pub fn new(trainer: Trainer<S>) -> Self {
        BatchTrainer {
            trainer,
            workers: 1,
        }
    }

    /// Train players on this many threads (minimum 1)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn trainer(&self) -> &Trainer<S> {
        &self.trainer
    }

    /// Distinct player ids for the season, in the order the source lists them
    pub fn players(&self, season: Season) -> Result<Vec<PlayerId>> {
        let rows = self.trainer.source().league_players(season)?;
        let mut seen = HashSet::new();
        Ok(rows
            .into_iter()
            .map(|row| row.player_id)
            .filter(|id| seen.insert(*id))
            .collect())
    }

    /// Train every player in the season.
    ///
    /// Only a failure to list the players is returned as an error.
    pub fn train_all(&self, season: Season) -> Result<BatchReport> {
        let players = self.players(season)?;
        log::info!("Found {} players for {}", players.len(), season);

        let results: Vec<Result<TrainOutcome>> = if self.workers <= 1 || players.len() <= 1 {
            players
                .iter()
                .enumerate()
                .map(|(i, &player)| self.train_one(i, players.len(), player, season))
                .collect()
        } else {
            self.train_parallel(&players, season)
        };

        let mut report = BatchReport::default();
        for (player, result) in players.iter().copied().zip(results) {
            report.record(player, result);
        }

        log::info!("Batch training for {} finished: {}", season, report);
        Ok(report)
    }

    fn train_one(
        &self,
        index: usize,
        total: usize,
        player: PlayerId,
        season: Season,
    ) -> Result<TrainOutcome> {
        log::info!("[{}/{}] Training player {}", index + 1, total, player);
        let result = self.trainer.train(player, season);
        if let Err(e) = &result {
            log::warn!("Failed to train player {}: {}", player, e);
        }
        result
    }

    /// Workers pull the next unclaimed index; results come back in input order
    fn train_parallel(&self, players: &[PlayerId], season: Season) -> Vec<Result<TrainOutcome>> {
        let next = AtomicUsize::new(0);
        let workers = self.workers.min(players.len());

        let mut results: Vec<(usize, Result<TrainOutcome>)> = std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                handles.push(scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        let Some(&player) = players.get(i) else {
                            break;
                        };
                        done.push((i, self.train_one(i, players.len(), player, season)));
                    }
                    done
                }));
            }
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, result)| result).collect()
    }
}
