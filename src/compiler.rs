//! Orchestration of a single XJC run.
//!
//! Stages run strictly in sequence: translation, materialization,
//! invocation, cleanup, then the optional annotation pass. Temporary
//! resources are released whether or not the tool succeeded.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::annotate::{AnnotationPass, AnnotationStats};
use crate::command::Command;
use crate::config::Config;
use crate::error::Result;
use crate::http_client::ResourceFetcher;
use crate::invoker::{Invocation, ToolOutcome};
use crate::materializer::ResourceMaterializer;
use crate::router::{LogSink, TracingSink};
use crate::translator::ArgumentTranslator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Translating,
    Materializing,
    Invoking,
    Cleanup,
    PostProcessing,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileStatus {
    Succeeded,
    /// The command named no schemas
    Skipped,
}

/// What happened to the annotation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PostProcessing {
    Disabled,
    Completed(AnnotationStats),
    Failed { message: String },
}

impl PostProcessing {
    pub fn is_failed(&self) -> bool {
        matches!(self, PostProcessing::Failed { .. })
    }
}

/// Summary of a successful (or skipped) compilation
#[derive(Debug, Clone, Serialize)]
pub struct CompileReport {
    pub status: CompileStatus,
    pub schemas: usize,
    pub bindings: usize,
    pub dest_dir: Option<PathBuf>,
    pub tool: Option<ToolOutcome>,
    pub post_processing: PostProcessing,
    pub temp_files_removed: usize,
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
}

impl CompileReport {
    fn skipped(command: &Command, started: Instant) -> Self {
        Self {
            status: CompileStatus::Skipped,
            schemas: 0,
            bindings: command.bindings.len(),
            dest_dir: command.dest_dir.clone(),
            tool: None,
            post_processing: PostProcessing::Disabled,
            temp_files_removed: 0,
            duration: started.elapsed(),
            finished_at: Utc::now(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.status == CompileStatus::Skipped
    }
}

/// Runs XJC for a [`Command`].
///
/// The invocation mode is fixed at construction; subprocess mode is the
/// default.
pub struct XjcCompiler {
    translator: ArgumentTranslator,
    materializer: ResourceMaterializer,
    invocation: Invocation,
    sink: Arc<dyn LogSink>,
    annotation: AnnotationPass,
}

impl XjcCompiler {
    pub fn new(materializer: ResourceMaterializer) -> Self {
        Self {
            translator: ArgumentTranslator::for_subprocess(),
            materializer,
            invocation: Invocation::default(),
            sink: Arc::new(TracingSink),
            annotation: AnnotationPass::new(),
        }
    }

    /// Subprocess compiler wired from the launcher, network and
    /// materializer sections
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = ResourceFetcher::new(config.network.http_client_config())?;
        let materializer = ResourceMaterializer::new(fetcher)
            .with_temp_dir(config.materializer.temp_dir.clone());

        Ok(Self::new(materializer)
            .with_invocation(Invocation::Subprocess(config.launcher.launcher()))
            .with_entry_point(config.launcher.entry_point.clone()))
    }

    /// Switch the invocation mode. The translator follows the mode: only
    /// forked launches name the entry point.
    pub fn with_invocation(mut self, invocation: Invocation) -> Self {
        self.translator = if invocation.is_subprocess() {
            ArgumentTranslator::for_subprocess()
        } else {
            ArgumentTranslator::for_in_process()
        };
        self.invocation = invocation;
        self
    }

    /// Override the entry point class of forked launches
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        if self.invocation.is_subprocess() {
            self.translator = ArgumentTranslator::new(Some(entry_point.into()));
        }
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_annotation_pass(mut self, annotation: AnnotationPass) -> Self {
        self.annotation = annotation;
        self
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn translator(&self) -> &ArgumentTranslator {
        &self.translator
    }

    /// Compile the schemas of `command`.
    ///
    /// Configuration and resource errors are returned before any process is
    /// started. A failed annotation pass is reported in the result without
    /// failing the compilation.
    pub async fn compile(&self, command: &Command) -> Result<CompileReport> {
        let started = Instant::now();

        if !command.has_schemas() {
            info!("no schemas to compile, skipping xjc");
            return Ok(CompileReport::skipped(command, started));
        }

        enter(Stage::Translating);
        let arguments = self.translator.translate(command)?;

        enter(Stage::Materializing);
        let resources = self.materializer.materialize(command).await?;

        enter(Stage::Invoking);
        let args = arguments.complete(resources.schemas(), resources.bindings());
        let invoked = self
            .invocation
            .run(args, command.catalog.is_some(), Arc::clone(&self.sink))
            .await;

        enter(Stage::Cleanup);
        let (temp_files_removed, cleaned) = resources.cleanup();
        if let Err(e) = cleaned {
            warn!(error = %e, removed = temp_files_removed, "temporary files were not all removed");
        }
        let tool = invoked?;

        let post_processing = match &command.dest_dir {
            Some(dest_dir) if command.suppress_warnings => {
                enter(Stage::PostProcessing);
                match self.annotation.run(dest_dir).await {
                    Ok(stats) => PostProcessing::Completed(stats),
                    Err(e) => {
                        error!(error = %e, "annotation pass failed");
                        PostProcessing::Failed {
                            message: e.to_string(),
                        }
                    }
                }
            }
            _ => PostProcessing::Disabled,
        };

        enter(Stage::Done);
        Ok(CompileReport {
            status: CompileStatus::Succeeded,
            schemas: command.schemas.len(),
            bindings: command.bindings.len(),
            dest_dir: command.dest_dir.clone(),
            tool: Some(tool),
            post_processing,
            temp_files_removed,
            duration: started.elapsed(),
            finished_at: Utc::now(),
        })
    }
}

fn enter(stage: Stage) {
    debug!(?stage, "xjc stage");
}
