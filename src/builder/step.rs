//! Execution of a single instruction against the build context

use super::context::BuildContext;
use crate::archive::{self, CopyPlan};
use crate::dockerfile::arguments;
use crate::dockerfile::{Command, Instruction, Verb};
use crate::engine::ContainerEngine;
use crate::error::BuildError;
use crate::progress::{ProgressEvent, ProgressHandler};
use futures_util::stream::StreamExt;
use tracing::{debug, info, warn};

/// Runs instructions one at a time; each call returns the image id that becomes current
pub(crate) struct StepExecutor<'a> {
    engine: &'a dyn ContainerEngine,
    progress: &'a dyn ProgressHandler,
    enforce_exit_code: bool,
}

impl<'a> StepExecutor<'a> {
    pub(crate) fn new(
        engine: &'a dyn ContainerEngine,
        progress: &'a dyn ProgressHandler,
        enforce_exit_code: bool,
    ) -> Self {
        Self {
            engine,
            progress,
            enforce_exit_code,
        }
    }

    pub(crate) async fn execute(
        &self,
        context: &mut BuildContext,
        instruction: &Instruction,
    ) -> Result<String, BuildError> {
        let verb = instruction.verb();
        let line = instruction.line();
        let current = match context.current_image() {
            Some(image) => image.to_string(),
            None if verb == Verb::From => String::new(),
            None => return Err(BuildError::NoBaseImage { verb, line }),
        };

        let args = instruction.resolve_args(&context.variables());
        let reject = |err| instruction.reject(err);
        debug!(line, verb = %verb, args = %args, "Executing instruction");

        match verb {
            Verb::From => {
                let mut tokens = args.split_whitespace();
                let image = match (tokens.next(), tokens.next()) {
                    (Some(image), None) => image,
                    _ => {
                        return Err(instruction
                            .invalid("This command takes exactly one argument")
                            .into())
                    }
                };
                return self.base_image(image).await;
            }
            Verb::Run => {
                let command = arguments::command(&args).map_err(reject)?;
                return self.run(context, instruction, &current, command).await;
            }
            Verb::Add | Verb::Copy => {
                return self.copy(context, instruction, &current, &args).await;
            }
            Verb::Maintainer => context.maintainer = Some(args.trim().to_string()),
            Verb::Cmd => {
                context.default_command = Some(arguments::command(&args).map_err(reject)?);
            }
            Verb::Label => {
                context
                    .labels
                    .extend(arguments::key_values(&args).map_err(reject)?);
            }
            Verb::Expose => {
                context
                    .ports
                    .extend(arguments::ports(&args).map_err(reject)?);
            }
            Verb::Env => {
                context
                    .env
                    .extend(arguments::env_pairs(&args).map_err(reject)?);
            }
            Verb::Entrypoint => {
                context.entrypoint = Some(arguments::command(&args).map_err(reject)?);
                if context.default_command.take().is_some() {
                    debug!(line, "ENTRYPOINT cleared the default command");
                }
            }
            Verb::Volume => {
                context
                    .volumes
                    .extend(arguments::string_list(&args).map_err(reject)?);
            }
            Verb::User => context.user = Some(args.trim().to_string()),
            Verb::Workdir => {
                context.workdir = Some(archive::resolve_container_path(
                    args.trim(),
                    context.workdir.as_deref(),
                ));
            }
            Verb::Arg => {
                context
                    .args
                    .extend(arguments::key_values(&args).map_err(reject)?);
            }
            Verb::Stopsignal => context.stop_signal = Some(args.trim().to_string()),
            Verb::Onbuild => debug!(line, trigger = %args, "ONBUILD trigger recorded, not executed"),
        }

        Ok(current)
    }

    /// Makes sure the base image is available locally, pulling it if needed
    async fn base_image(&self, image: &str) -> Result<String, BuildError> {
        if self.engine.image_exists(image).await? {
            debug!(image, "Base image present locally");
            return Ok(image.to_string());
        }

        info!(image, engine = self.engine.name(), "Pulling base image");
        let mut stream = self.engine.pull_image(image);
        while let Some(item) = stream.next().await {
            let progress = item?;
            if let Some(message) = progress.error {
                return Err(BuildError::Pull {
                    image: image.to_string(),
                    message,
                });
            }
            if let Some(status) = progress.status {
                self.progress.on_progress(&ProgressEvent::PullStatus {
                    image: image.to_string(),
                    status,
                });
            }
        }
        Ok(image.to_string())
    }

    async fn run(
        &self,
        context: &BuildContext,
        instruction: &Instruction,
        current: &str,
        command: Command,
    ) -> Result<String, BuildError> {
        let spec = context.container_spec(current, Some(command.argv()));
        let container = self.engine.create_container(&spec).await?;
        debug!(container = %container, image = current, "Starting container");

        self.engine.start_container(&container).await?;
        let code = self.engine.wait_container(&container).await?;
        if code != 0 {
            if self.enforce_exit_code {
                return Err(BuildError::NonZeroExit {
                    line: instruction.line(),
                    code,
                });
            }
            warn!(
                line = instruction.line(),
                container = %container,
                code,
                "RUN exited with a non-zero status; committing anyway"
            );
        }

        self.commit(context, instruction, &container).await
    }

    async fn copy(
        &self,
        context: &BuildContext,
        instruction: &Instruction,
        current: &str,
        args: &str,
    ) -> Result<String, BuildError> {
        let (patterns, destination) =
            arguments::sources_and_destination(args).map_err(|err| instruction.reject(err))?;

        let mut sources = Vec::new();
        for pattern in &patterns {
            let matched = archive::expand_source(context.base_dir(), pattern)?;
            if matched.is_empty() {
                return Err(instruction
                    .invalid(format!(
                        "Source \"{}\" matches nothing in the build context",
                        pattern
                    ))
                    .into());
            }
            sources.extend(matched);
        }

        let plan = CopyPlan::new(sources, &destination, context.workdir.as_deref())
            .map_err(|explanation| instruction.invalid(explanation))?;
        let archive = archive::build_archive(context.base_dir(), &plan.entries)?;
        debug!(
            root = %plan.upload_root,
            entries = plan.entries.len(),
            bytes = archive.len(),
            "Packaged sources"
        );

        let command = context.default_command.as_ref().map(Command::argv);
        let spec = context.container_spec(current, command);
        let container = self.engine.create_container(&spec).await?;
        self.engine
            .put_archive(&container, &plan.upload_root, archive)
            .await?;

        self.commit(context, instruction, &container).await
    }

    async fn commit(
        &self,
        context: &BuildContext,
        instruction: &Instruction,
        container: &str,
    ) -> Result<String, BuildError> {
        let message = instruction.to_string();
        let image = self
            .engine
            .commit_container(container, context.maintainer.as_deref(), Some(&message))
            .await?;
        debug!(container, image = %image, "Committed layer");
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineCall, PullProgress, RecordingEngine};
    use crate::error::ParseError;
    use crate::progress::NoOpHandler;
    use std::fs;
    use tempfile::TempDir;

    fn instruction(verb: Verb, args: &str) -> Instruction {
        Instruction::new(verb, args, 1).unwrap()
    }

    fn based_on(image: &str) -> BuildContext {
        let mut context = BuildContext::new("/ctx");
        context.push_image(image);
        context
    }

    #[tokio::test]
    async fn test_metadata_returns_current_image() {
        let engine = RecordingEngine::new();
        let executor = StepExecutor::new(&engine, &NoOpHandler, false);
        let mut context = based_on("busybox");

        let image = executor
            .execute(&mut context, &instruction(Verb::Label, "a=1 b=2"))
            .await
            .unwrap();

        assert_eq!(image, "busybox");
        assert_eq!(context.labels.get("b").map(String::as_str), Some("2"));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_from_pulls_missing_image() {
        let engine = RecordingEngine::new().with_pull_progress(vec![
            PullProgress::status("Pulling fs layer"),
            PullProgress::status("Download complete"),
        ]);
        let executor = StepExecutor::new(&engine, &NoOpHandler, false);
        let mut context = BuildContext::new("/ctx");

        let image = executor
            .execute(&mut context, &instruction(Verb::From, "alpine:3.19"))
            .await
            .unwrap();

        assert_eq!(image, "alpine:3.19");
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::ImageExists("alpine:3.19".to_string()),
                EngineCall::PullImage("alpine:3.19".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_from_substitution_must_stay_one_token() {
        let engine = RecordingEngine::new();
        let executor = StepExecutor::new(&engine, &NoOpHandler, false);
        let mut context = BuildContext::new("/ctx");
        context
            .args
            .insert("BASE".to_string(), "busybox AS build".to_string());

        let err = executor
            .execute(&mut context, &instruction(Verb::From, "$BASE"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Parse(ParseError::InvalidArguments {
                verb: Verb::From,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_non_from_without_base_image() {
        let engine = RecordingEngine::new();
        let executor = StepExecutor::new(&engine, &NoOpHandler, false);
        let mut context = BuildContext::new("/ctx");

        let err = executor
            .execute(&mut context, &instruction(Verb::Env, "A=1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::NoBaseImage {
                verb: Verb::Env,
                line: 1
            }
        ));
        assert!(context.env.is_empty());
    }

    #[tokio::test]
    async fn test_run_commits_with_maintainer_and_instruction() {
        let engine = RecordingEngine::new();
        let executor = StepExecutor::new(&engine, &NoOpHandler, false);
        let mut context = based_on("busybox");
        context.maintainer = Some("Jane <jane@example.com>".to_string());

        let image = executor
            .execute(&mut context, &instruction(Verb::Run, "echo hi"))
            .await
            .unwrap();

        assert_eq!(image, "sha256:layer-1");
        let created = engine.created_containers();
        assert_eq!(
            created[0].command,
            Some(vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                "echo hi".to_string()
            ])
        );
        assert!(engine.calls().contains(&EngineCall::CommitContainer {
            container: "container-1".to_string(),
            author: Some("Jane <jane@example.com>".to_string()),
            message: Some("RUN echo hi".to_string()),
        }));
    }

    #[tokio::test]
    async fn test_run_exit_code_enforcement() {
        let engine = RecordingEngine::new().with_exit_code(2);

        let lenient = StepExecutor::new(&engine, &NoOpHandler, false);
        assert!(lenient
            .execute(&mut based_on("busybox"), &instruction(Verb::Run, "false"))
            .await
            .is_ok());

        let strict = StepExecutor::new(&engine, &NoOpHandler, true);
        let err = strict
            .execute(&mut based_on("busybox"), &instruction(Verb::Run, "false"))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::NonZeroExit { line: 1, code: 2 }));
    }

    #[tokio::test]
    async fn test_entrypoint_clears_default_command() {
        let engine = RecordingEngine::new();
        let executor = StepExecutor::new(&engine, &NoOpHandler, false);
        let mut context = based_on("busybox");

        executor
            .execute(&mut context, &instruction(Verb::Cmd, "[\"--help\"]"))
            .await
            .unwrap();
        assert!(context.default_command.is_some());

        executor
            .execute(&mut context, &instruction(Verb::Entrypoint, "[\"app\"]"))
            .await
            .unwrap();
        assert_eq!(context.default_command, None);
        assert_eq!(
            context.entrypoint,
            Some(Command::Exec(vec!["app".to_string()]))
        );
    }

    #[tokio::test]
    async fn test_workdir_resolves_relative_paths() {
        let engine = RecordingEngine::new();
        let executor = StepExecutor::new(&engine, &NoOpHandler, false);
        let mut context = based_on("busybox");

        executor
            .execute(&mut context, &instruction(Verb::Workdir, "/srv"))
            .await
            .unwrap();
        executor
            .execute(&mut context, &instruction(Verb::Workdir, "app"))
            .await
            .unwrap();
        assert_eq!(context.workdir.as_deref(), Some("/srv/app"));
    }

    #[tokio::test]
    async fn test_copy_uploads_planned_archive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("src.txt"), "hello").unwrap();

        let engine = RecordingEngine::new();
        let executor = StepExecutor::new(&engine, &NoOpHandler, false);
        let mut context = BuildContext::new(dir.path());
        context.push_image("busybox");

        let image = executor
            .execute(&mut context, &instruction(Verb::Copy, "src.txt /opt/dest.txt"))
            .await
            .unwrap();

        assert_eq!(image, "sha256:layer-1");
        assert!(engine.calls().contains(&EngineCall::PutArchive {
            container: "container-1".to_string(),
            path: "/opt".to_string(),
            entries: vec!["dest.txt".to_string()],
        }));
        assert!(!engine
            .calls()
            .contains(&EngineCall::StartContainer("container-1".to_string())));
    }

    #[tokio::test]
    async fn test_copy_pattern_matching_nothing() {
        let dir = TempDir::new().unwrap();
        let engine = RecordingEngine::new();
        let executor = StepExecutor::new(&engine, &NoOpHandler, false);
        let mut context = BuildContext::new(dir.path());
        context.push_image("busybox");

        let err = executor
            .execute(&mut context, &instruction(Verb::Add, "*.jar /app/"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Parse(ParseError::InvalidArguments {
                verb: Verb::Add,
                ..
            })
        ));
        assert!(engine.created_containers().is_empty());
    }

    #[tokio::test]
    async fn test_onbuild_is_inert() {
        let engine = RecordingEngine::new();
        let executor = StepExecutor::new(&engine, &NoOpHandler, false);
        let mut context = based_on("busybox");

        let image = executor
            .execute(&mut context, &instruction(Verb::Onbuild, "RUN make"))
            .await
            .unwrap();
        assert_eq!(image, "busybox");
        assert!(engine.calls().is_empty());
    }
}
