//! Generic stage navigation over the data-driven catalog.
//!
//! One `StageSequencer` serves every level; per-level behavior comes only
//! from the level's `StageSequence`.

use std::sync::Arc;

use crate::catalog::{Catalog, Level, StageSequence};
use crate::errors::ProgressionError;
use crate::stage::{Stage, StageId};

#[derive(Debug, Clone)]
pub struct StageSequencer {
    catalog: Arc<Catalog>,
    /// Propagate invalid stages instead of clamping them to the first stage
    strict: bool,
}

impl StageSequencer {
    pub fn new(catalog: Arc<Catalog>, strict: bool) -> Self {
        Self { catalog, strict }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn level(&self, level_id: u32) -> Result<&Level, ProgressionError> {
        self.catalog
            .level(level_id)
            .ok_or(ProgressionError::UnknownLevel { level_id })
    }

    fn locate(
        &self,
        level_id: u32,
        stage: &StageId,
    ) -> Result<(&StageSequence, usize), ProgressionError> {
        let sequence = &self.level(level_id)?.stages;
        let index = sequence
            .position(stage)
            .ok_or_else(|| ProgressionError::InvalidStage {
                level_id,
                stage: stage.clone(),
            })?;
        Ok((sequence, index))
    }

    /// Look up a stage definition by id.
    pub fn stage(&self, level_id: u32, stage: &StageId) -> Result<&Stage, ProgressionError> {
        let (sequence, index) = self.locate(level_id, stage)?;
        Ok(&sequence.stages()[index])
    }

    /// Successor of `stage`; the terminal stage maps to itself.
    pub fn next(&self, level_id: u32, stage: &StageId) -> Result<StageId, ProgressionError> {
        let (sequence, index) = self.locate(level_id, stage)?;
        let next = (index + 1).min(sequence.len() - 1);
        Ok(sequence.stages()[next].id.clone())
    }

    /// Predecessor of `stage`; the first stage maps to itself.
    pub fn previous(&self, level_id: u32, stage: &StageId) -> Result<StageId, ProgressionError> {
        let (sequence, index) = self.locate(level_id, stage)?;
        Ok(sequence.stages()[index.saturating_sub(1)].id.clone())
    }

    pub fn is_terminal(&self, level_id: u32, stage: &StageId) -> Result<bool, ProgressionError> {
        let (sequence, index) = self.locate(level_id, stage)?;
        Ok(index + 1 == sequence.len())
    }

    /// Navigation label for a stage.
    ///
    /// Titles are stored on the stage itself, so the only unmapped values are
    /// ids that do not belong to the level.
    pub fn display_name(&self, level_id: u32, stage: &StageId) -> Result<&str, ProgressionError> {
        let sequence = &self.level(level_id)?.stages;
        sequence
            .get(stage)
            .map(|s| s.title.as_str())
            .ok_or_else(|| ProgressionError::UnknownStage {
                level_id,
                stage: stage.clone(),
            })
    }

    pub fn first(&self, level_id: u32) -> Result<&Stage, ProgressionError> {
        Ok(self.level(level_id)?.stages.first())
    }

    pub fn terminal(&self, level_id: u32) -> Result<&Stage, ProgressionError> {
        Ok(self.level(level_id)?.stages.terminal())
    }

    /// Validate a stage restored from storage.
    ///
    /// In strict mode a foreign stage is an error; otherwise it is clamped to
    /// the level's first stage. Unknown levels always fail.
    pub fn resolve(&self, level_id: u32, stage: &StageId) -> Result<StageId, ProgressionError> {
        match self.locate(level_id, stage) {
            Ok(_) => Ok(stage.clone()),
            Err(err @ ProgressionError::InvalidStage { .. }) if !self.strict => {
                let first = self.first(level_id)?.id.clone();
                tracing::error!(
                    level_id,
                    stage = %stage,
                    clamped_to = %first,
                    "{err}; clamping to first stage"
                );
                Ok(first)
            }
            Err(err) => Err(err),
        }
    }
}
