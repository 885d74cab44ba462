use serde::Serialize;
use tpve_core::error::{DeployError, StageError};
use tpve_core::stage::{Stage, StageSelection};
use tpve_core::validate::validate;
use tracing::info;

use super::{Deployer, LifecycleReport};

/// Progress notification emitted while a deploy runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    /// `index` counts enabled stages from 1 up to `total`.
    Started {
        stage: Stage,
        index: usize,
        total: usize,
    },
    Skipped {
        stage: Stage,
    },
    Finished {
        stage: Stage,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    pub completed: Vec<Stage>,
    pub skipped: Vec<Stage>,
}

/// Validated entry points over a [`Deployer`]. Every operation checks the
/// descriptor first and tags stage failures with the stage that failed.
pub struct Pipeline<'a> {
    deployer: Deployer<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(deployer: Deployer<'a>) -> Self {
        Self { deployer }
    }

    pub fn deployer(&self) -> &Deployer<'a> {
        &self.deployer
    }

    /// Run the enabled deploy stages in fixed order, stopping at the first
    /// failure.
    pub fn deploy(
        &self,
        selection: &StageSelection,
        observer: &mut dyn FnMut(&StageEvent),
    ) -> Result<DeployReport, DeployError> {
        validate(self.deployer.descriptor())?;

        let total = selection.enabled().len();
        let mut report = DeployReport::default();
        for stage in Stage::DEPLOY {
            if !selection.is_enabled(stage) {
                info!(%stage, "skipped");
                observer(&StageEvent::Skipped { stage });
                report.skipped.push(stage);
                continue;
            }
            observer(&StageEvent::Started {
                stage,
                index: report.completed.len() + 1,
                total,
            });
            self.run_stage(stage)
                .map_err(|source| DeployError::Stage { stage, source })?;
            observer(&StageEvent::Finished { stage });
            report.completed.push(stage);
        }
        info!(
            completed = report.completed.len(),
            skipped = report.skipped.len(),
            "deploy finished"
        );
        Ok(report)
    }

    /// Only called with members of [`Stage::DEPLOY`].
    fn run_stage(&self, stage: Stage) -> Result<(), StageError> {
        debug_assert!(stage.is_deploy());
        let d = &self.deployer;
        match stage {
            Stage::PrepareImage => d.prepare_image(),
            Stage::CreateTemplate => d.create_template(),
            Stage::CreateNodes => d.create_nodes(),
            Stage::GenerateConfig => d.generate_config(),
            Stage::ApplyConfig => d.apply_config(),
            Stage::Bootstrap => d.bootstrap(),
            Stage::StartNodes | Stage::StopNodes | Stage::Destroy | Stage::Verify => {
                unreachable!("{stage} is not a deploy stage")
            }
        }
    }

    fn guarded<T>(
        &self,
        stage: Stage,
        op: impl FnOnce(&Deployer<'a>) -> Result<T, StageError>,
    ) -> Result<T, DeployError> {
        validate(self.deployer.descriptor())?;
        op(&self.deployer).map_err(|source| DeployError::Stage { stage, source })
    }

    pub fn destroy(&self) -> Result<LifecycleReport, DeployError> {
        self.guarded(Stage::Destroy, Deployer::destroy)
    }

    pub fn start(&self) -> Result<LifecycleReport, DeployError> {
        self.guarded(Stage::StartNodes, Deployer::start_nodes)
    }

    pub fn stop(&self) -> Result<LifecycleReport, DeployError> {
        self.guarded(Stage::StopNodes, Deployer::stop_nodes)
    }

    pub fn restart(&self) -> Result<LifecycleReport, DeployError> {
        self.guarded(Stage::StopNodes, Deployer::restart_nodes)
    }

    pub fn verify(&self) -> Result<(), DeployError> {
        self.guarded(Stage::Verify, Deployer::verify)
    }
}
